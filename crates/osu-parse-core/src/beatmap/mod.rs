//! Beatmap data structures and the `.osu` decoder

mod curve;
mod decoder;
mod metadata;
mod objects;
mod stacking;
mod timing;

pub use curve::SliderPath;
pub use decoder::{
    decode_beatmap, decode_beatmap_extra, LAZER_FORMAT_VERSION, MAX_FORMAT_VERSION,
    MIN_FORMAT_VERSION,
};
pub use metadata::*;
pub use objects::*;
pub use timing::*;

use serde::{Deserialize, Serialize};

use crate::mods::Mods;

/// Represents a game mode in osu!
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Osu = 0,
    Taiko = 1,
    Catch = 2,
    Mania = 3,
}

impl GameMode {
    /// Strict conversion; `None` for unknown mode identifiers.
    pub fn from_id(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Osu),
            1 => Some(Self::Taiko),
            2 => Some(Self::Catch),
            3 => Some(Self::Mania),
            _ => None,
        }
    }
}

/// Hit windows in milliseconds (half-widths around the object's start time)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitWindows {
    pub great: f64,
    pub ok: f64,
    pub meh: f64,
}

/// Difficulty settings for a beatmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapDifficulty {
    pub hp_drain: f32,
    pub circle_size: f32,
    pub overall_difficulty: f32,
    pub approach_rate: f32,
    pub slider_multiplier: f64,
    pub slider_tick_rate: f64,
}

impl Default for BeatmapDifficulty {
    fn default() -> Self {
        Self {
            hp_drain: 5.0,
            circle_size: 5.0,
            overall_difficulty: 5.0,
            approach_rate: 5.0,
            slider_multiplier: 1.4,
            slider_tick_rate: 1.0,
        }
    }
}

impl BeatmapDifficulty {
    /// Apply HR/EZ scaling, capped to the valid range.
    pub fn with_mods(&self, mods: Mods) -> Self {
        let multiplier = mods.od_ar_hp_multiplier();
        Self {
            hp_drain: (self.hp_drain * multiplier).min(10.0),
            circle_size: (self.circle_size * mods.cs_multiplier()).min(10.0),
            overall_difficulty: (self.overall_difficulty * multiplier).min(10.0),
            approach_rate: (self.approach_rate * multiplier).min(10.0),
            ..self.clone()
        }
    }

    /// Approach time in milliseconds.
    pub fn preempt(&self) -> f64 {
        difficulty_range(f64::from(self.approach_rate), 1800.0, 1200.0, 450.0)
    }

    /// Object scale relative to a CS 5 hit circle's texture.
    pub fn scale(&self) -> f32 {
        (1.0 - 0.7 * (self.circle_size - 5.0) / 5.0) / 2.0
    }

    /// Hit circle radius in osu!pixels.
    pub fn circle_radius(&self) -> f32 {
        64.0 * self.scale()
    }

    pub fn hit_windows(&self) -> HitWindows {
        let od = f64::from(self.overall_difficulty);
        HitWindows {
            great: 80.0 - 6.0 * od,
            ok: 140.0 - 8.0 * od,
            meh: 200.0 - 10.0 * od,
        }
    }
}

/// Map a 0..=10 difficulty value onto a min/mid/max range.
pub fn difficulty_range(value: f64, min: f64, mid: f64, max: f64) -> f64 {
    if value > 5.0 {
        mid + (max - mid) * (value - 5.0) / 5.0
    } else if value < 5.0 {
        mid - (mid - min) * (5.0 - value) / 5.0
    } else {
        mid
    }
}

/// Inverse of [`difficulty_range`] for the approach-rate curve.
pub fn approach_rate_from_preempt(preempt: f64) -> f64 {
    if preempt > 1200.0 {
        (1800.0 - preempt) / 120.0
    } else {
        (1200.0 - preempt) / 150.0 + 5.0
    }
}

/// A break period from the `[Events]` section
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakPeriod {
    pub start_time: f64,
    pub end_time: f64,
}

impl BreakPeriod {
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}

/// Combo colour from the `[Colours]` section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

/// A fully decoded beatmap
///
/// Produced by [`decode_beatmap`] or [`decode_beatmap_extra`] and not mutated
/// afterwards. Hit objects and timing points are in ascending time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatmapRecord {
    pub format_version: u32,
    /// MD5 of the raw file, lowercase hex
    pub hash: String,
    pub general: BeatmapGeneral,
    pub metadata: BeatmapMetadata,
    pub mode: GameMode,
    pub difficulty: BeatmapDifficulty,
    pub background_file: Option<String>,
    pub timing_points: Vec<TimingPoint>,
    pub breaks: Vec<BreakPeriod>,
    pub combo_colors: Vec<Color>,
    pub hit_objects: Vec<HitObject>,
    pub n_circles: u32,
    pub n_sliders: u32,
    pub n_spinners: u32,
    /// Combo of a full-combo play, counting slider ticks, repeats and tails
    pub max_combo: u32,
    /// End of the last object in milliseconds
    pub map_length_ms: u32,
    /// Playable time excluding breaks, in milliseconds
    pub drain_time_ms: u32,
    /// Duration-weighted BPM of the uninherited timing points
    pub bpm: Option<f64>,
    /// Whether slider paths and stacking have been resolved
    pub extra_resolved: bool,
}

/// Combo of a full-combo play over `objects`, summed without overflow.
pub fn total_combo(objects: &[HitObject]) -> u64 {
    objects.iter().map(|h| u64::from(h.combo_weight())).sum()
}

impl BeatmapRecord {
    pub fn object_count(&self) -> usize {
        self.hit_objects.len()
    }

    pub(crate) fn compute_derived(&mut self) {
        self.n_circles = self.hit_objects.iter().filter(|h| h.is_circle()).count() as u32;
        self.n_sliders = self.hit_objects.iter().filter(|h| h.is_slider()).count() as u32;
        self.n_spinners = self.hit_objects.iter().filter(|h| h.is_spinner()).count() as u32;
        self.max_combo = u32::try_from(total_combo(&self.hit_objects)).unwrap_or(u32::MAX);

        let first_start = self.hit_objects.first().map(|h| h.start_time).unwrap_or(0.0);
        let last_end = self
            .hit_objects
            .iter()
            .map(|h| h.end_time)
            .fold(0.0_f64, f64::max);
        self.map_length_ms = last_end.max(0.0) as u32;

        let break_time: f64 = self.breaks.iter().map(BreakPeriod::duration).sum();
        self.drain_time_ms = (last_end - first_start - break_time).max(0.0) as u32;

        self.bpm = self.calculate_bpm(last_end);
    }

    /// Weight each uninherited point's BPM by how long it stays in effect.
    fn calculate_bpm(&self, last_time: f64) -> Option<f64> {
        let points: Vec<&TimingPoint> = self
            .timing_points
            .iter()
            .filter(|p| p.bpm().is_some())
            .collect();

        let first = points.first()?;
        if points.len() == 1 || self.hit_objects.is_empty() {
            return first.bpm();
        }

        let mut weighted = 0.0;
        let mut total = 0.0;
        for (i, point) in points.iter().enumerate() {
            let until = points.get(i + 1).map(|next| next.time).unwrap_or(last_time);
            let duration = (until - point.time).max(0.0);
            weighted += duration * point.bpm().unwrap_or(0.0);
            total += duration;
        }

        if total > 0.0 {
            Some(weighted / total)
        } else {
            first.bpm()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_mode_from_id() {
        assert_eq!(GameMode::from_id(0), Some(GameMode::Osu));
        assert_eq!(GameMode::from_id(3), Some(GameMode::Mania));
        assert_eq!(GameMode::from_id(4), None);
    }

    #[test]
    fn test_preempt_curve() {
        let mut diff = BeatmapDifficulty::default();
        assert_eq!(diff.preempt(), 1200.0);
        diff.approach_rate = 10.0;
        assert_eq!(diff.preempt(), 450.0);
        diff.approach_rate = 0.0;
        assert_eq!(diff.preempt(), 1800.0);
        assert!((approach_rate_from_preempt(450.0) - 10.0).abs() < 1e-9);
        assert!((approach_rate_from_preempt(1800.0)).abs() < 1e-9);
    }

    #[test]
    fn test_hard_rock_caps_at_ten() {
        let diff = BeatmapDifficulty {
            overall_difficulty: 9.0,
            circle_size: 4.0,
            ..Default::default()
        };
        let hr = diff.with_mods(Mods::HARD_ROCK);
        assert_eq!(hr.overall_difficulty, 10.0);
        assert!((hr.circle_size - 5.2).abs() < 1e-5);

        let ez = diff.with_mods(Mods::EASY);
        assert_eq!(ez.overall_difficulty, 4.5);
    }

    #[test]
    fn test_hit_windows_od5() {
        let windows = BeatmapDifficulty::default().hit_windows();
        assert_eq!(windows.great, 50.0);
        assert_eq!(windows.ok, 100.0);
        assert_eq!(windows.meh, 150.0);
    }

    #[test]
    fn test_circle_radius_cs4() {
        let diff = BeatmapDifficulty {
            circle_size: 4.0,
            ..Default::default()
        };
        // 54.4 - 4.48 * CS
        assert!((diff.circle_radius() - 36.48).abs() < 1e-3);
    }
}
