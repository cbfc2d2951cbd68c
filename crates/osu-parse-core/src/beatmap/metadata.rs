//! Beatmap metadata structures

use serde::{Deserialize, Serialize};

use super::GameMode;

/// `[Metadata]` section of a beatmap
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeatmapMetadata {
    /// Romanized song title
    pub title: String,
    /// Unicode song title
    pub title_unicode: Option<String>,
    /// Romanized artist name
    pub artist: String,
    /// Unicode artist name
    pub artist_unicode: Option<String>,
    /// Beatmap creator username
    pub creator: String,
    /// Difficulty name
    pub version: String,
    /// Source (game, anime, etc.)
    pub source: Option<String>,
    /// Tags for searching
    pub tags: Vec<String>,
    /// Online beatmap ID
    pub beatmap_id: Option<i32>,
    /// Online beatmap set ID
    pub beatmap_set_id: Option<i32>,
}

impl BeatmapMetadata {
    /// Get display title (unicode if available, otherwise romanized)
    pub fn display_title(&self) -> &str {
        self.title_unicode.as_deref().unwrap_or(&self.title)
    }

    /// Get display artist (unicode if available, otherwise romanized)
    pub fn display_artist(&self) -> &str {
        self.artist_unicode.as_deref().unwrap_or(&self.artist)
    }
}

/// `[General]` section of a beatmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapGeneral {
    pub audio_file: String,
    pub audio_lead_in: i32,
    pub preview_time: i32,
    /// Fraction of the approach time within which coincident objects stack
    pub stack_leniency: f32,
    pub mode: GameMode,
}

impl Default for BeatmapGeneral {
    fn default() -> Self {
        Self {
            audio_file: String::new(),
            audio_lead_in: 0,
            preview_time: -1,
            stack_leniency: 0.7,
            mode: GameMode::Osu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefers_unicode() {
        let mut meta = BeatmapMetadata {
            title: "Kimi no Shiranai".to_string(),
            artist: "Supercell".to_string(),
            ..Default::default()
        };
        assert_eq!(meta.display_title(), "Kimi no Shiranai");

        meta.title_unicode = Some("君の知らない".to_string());
        assert_eq!(meta.display_title(), "君の知らない");
        assert_eq!(meta.display_artist(), "Supercell");
    }
}
