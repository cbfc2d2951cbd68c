//! Public entry points
//!
//! Every call is self-contained: bytes in, an owned record out. The free
//! functions use [`ParserConfig::default`]; a [`Parser`] carries tuned
//! configuration.

use serde::Serialize;

use crate::beatmap::{self, BeatmapRecord};
use crate::config::ParserConfig;
use crate::diagnostics::guarded;
use crate::error::{Error, Result};
use crate::mods::Mods;
use crate::replay::{self, ReplayRecord};
use crate::resolve::{resolve, AnnotatedHitObject, ResolveInput, ScoreStatsRecord};
use crate::strain::{
    adjust_sequence, calculate_performance, check_section_count, compute_chart, gradual_difficulty,
    BeatmapAttributes, StrainReport,
};

/// A replay together with the outcome of every object of its beatmap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayExtra {
    pub replay: ReplayRecord,
    pub annotations: Vec<AnnotatedHitObject>,
}

/// Decoder and strain engine with a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Decode a `.osr` replay. Frames stay compressed until first accessed.
    pub fn decode_replay(&self, bytes: &[u8]) -> Result<ReplayRecord> {
        guarded("decode_replay", || replay::decode_replay(bytes))
    }

    /// Decode a replay and its beatmap, then judge every object from the frames.
    pub fn decode_replay_extra(
        &self,
        replay_bytes: &[u8],
        beatmap_bytes: &[u8],
    ) -> Result<ReplayExtra> {
        guarded("decode_replay_extra", || {
            self.config.resolver.validate()?;
            let replay = replay::decode_replay(replay_bytes)?;
            let beatmap = beatmap::decode_beatmap_extra(beatmap_bytes)?;

            if !replay.beatmap_hash.eq_ignore_ascii_case(&beatmap.hash) {
                tracing::warn!(
                    replay = %replay.beatmap_hash,
                    beatmap = %beatmap.hash,
                    "Replay was recorded on a different beatmap version"
                );
            }

            let annotations = {
                let frames = replay.frames.frames()?;
                resolve(
                    &beatmap,
                    ResolveInput::Frames {
                        frames: &frames.frames,
                        mods: replay.mods,
                    },
                    &self.config.resolver,
                )?
            };

            Ok(ReplayExtra {
                replay,
                annotations,
            })
        })
    }

    /// Decode the base sections of a `.osu` beatmap.
    pub fn decode_beatmap(&self, bytes: &[u8]) -> Result<BeatmapRecord> {
        guarded("decode_beatmap", || beatmap::decode_beatmap(bytes))
    }

    /// Decode a beatmap with slider paths and stacking resolved.
    pub fn decode_beatmap_extra(&self, bytes: &[u8]) -> Result<BeatmapRecord> {
        guarded("decode_beatmap_extra", || beatmap::decode_beatmap_extra(bytes))
    }

    /// Strain peaks of a beatmap, optionally re-weighted by score data.
    ///
    /// A single record is treated as the final state of a score; a longer
    /// slice as cumulative states, one per processed object.
    pub fn compute_strains(
        &self,
        bytes: &[u8],
        score_stats: Option<&[ScoreStatsRecord]>,
        mods: Mods,
    ) -> Result<StrainReport> {
        guarded("compute_strains", || {
            self.config.validate()?;
            let beatmap = beatmap::decode_beatmap_extra(bytes)?;
            let config = &self.config.strain;
            check_section_count(&beatmap, mods, config)?;
            let chart = compute_chart(&beatmap, mods, config);

            let mut report = StrainReport {
                difficulty: chart.attributes.clone(),
                chart: chart.sequence.clone(),
                adjusted: None,
                performance: None,
                gradual_performance: None,
            };

            match score_stats {
                None => {}
                Some([]) => {
                    return Err(Error::InconsistentScoreStats(
                        "empty score state sequence".to_string(),
                    ))
                }
                Some([stats]) => {
                    let annotations = resolve(
                        &beatmap,
                        ResolveInput::ScoreStats(stats),
                        &self.config.resolver,
                    )?;
                    report.adjusted = Some(adjust_sequence(&chart, &annotations, config));
                    report.performance =
                        Some(calculate_performance(&chart.attributes, Some(stats), mods, config));
                }
                Some(states) => {
                    let annotations = resolve(
                        &beatmap,
                        ResolveInput::ScoreStates(states),
                        &self.config.resolver,
                    )?;
                    report.adjusted = Some(adjust_sequence(&chart, &annotations, config));

                    let gradual: Vec<_> = gradual_difficulty(&beatmap, mods, config)
                        .iter()
                        .zip(states)
                        .map(|(attributes, state)| {
                            calculate_performance(attributes, Some(state), mods, config)
                        })
                        .collect();
                    report.performance = gradual.last().cloned();
                    report.gradual_performance = Some(gradual);
                }
            }

            Ok(report)
        })
    }

    /// Difficulty and performance of a beatmap; a full-combo SS when no score is given.
    pub fn compute_attributes(
        &self,
        bytes: &[u8],
        score: Option<ScoreStatsRecord>,
        mods: Mods,
    ) -> Result<BeatmapAttributes> {
        guarded("compute_attributes", || {
            self.config.validate()?;
            let beatmap = beatmap::decode_beatmap_extra(bytes)?;

            if let Some(score) = &score {
                let objects = beatmap.hit_objects.len();
                if score.judged() > objects as u64 {
                    return Err(Error::InconsistentScoreStats(format!(
                        "{} judgements for {} objects",
                        score.judged(),
                        objects
                    )));
                }
            }

            let config = &self.config.strain;
            check_section_count(&beatmap, mods, config)?;
            let chart = compute_chart(&beatmap, mods, config);
            let performance = calculate_performance(&chart.attributes, score.as_ref(), mods, config);

            Ok(BeatmapAttributes {
                difficulty: chart.attributes,
                performance,
            })
        })
    }
}

/// Decode a `.osr` replay with default configuration.
pub fn decode_replay(bytes: &[u8]) -> Result<ReplayRecord> {
    Parser::default().decode_replay(bytes)
}

/// Decode a replay and its beatmap, then judge every object from the frames.
pub fn decode_replay_extra(replay_bytes: &[u8], beatmap_bytes: &[u8]) -> Result<ReplayExtra> {
    Parser::default().decode_replay_extra(replay_bytes, beatmap_bytes)
}

/// Decode the base sections of a `.osu` beatmap.
pub fn decode_beatmap(bytes: &[u8]) -> Result<BeatmapRecord> {
    Parser::default().decode_beatmap(bytes)
}

/// Decode a beatmap with slider paths and stacking resolved.
pub fn decode_beatmap_extra(bytes: &[u8]) -> Result<BeatmapRecord> {
    Parser::default().decode_beatmap_extra(bytes)
}

/// Strain peaks of a beatmap with default configuration.
pub fn compute_strains(
    bytes: &[u8],
    score_stats: Option<&[ScoreStatsRecord]>,
    mods: Mods,
) -> Result<StrainReport> {
    Parser::default().compute_strains(bytes, score_stats, mods)
}

/// Difficulty and performance of a beatmap with default configuration.
pub fn compute_attributes(
    bytes: &[u8],
    score: Option<ScoreStatsRecord>,
    mods: Mods,
) -> Result<BeatmapAttributes> {
    Parser::default().compute_attributes(bytes, score, mods)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = "osu file format v14

[General]
Mode: 0

[Difficulty]
HPDrainRate:5
CircleSize:4
OverallDifficulty:8
ApproachRate:9
SliderMultiplier:1.4
SliderTickRate:1

[TimingPoints]
0,300,4,2,0,60,1,0

[HitObjects]
100,100,0,1,0
200,100,150,1,0
300,100,300,1,0
400,100,450,1,0
";

    fn stats(max_combo: u32, n300: u32, n100: u32, n50: u32, n_misses: u32) -> ScoreStatsRecord {
        ScoreStatsRecord {
            max_combo,
            n300,
            n100,
            n50,
            n_misses,
            ..Default::default()
        }
    }

    #[test]
    fn test_strains_without_score() {
        let report = compute_strains(MAP.as_bytes(), None, Mods::empty()).unwrap();
        assert!(report.difficulty.stars > 0.0);
        assert!(report.adjusted.is_none());
        assert!(report.performance.is_none());
        assert_eq!(report.difficulty.n_circles, 4);
    }

    #[test]
    fn test_strains_with_final_score() {
        let score = [stats(2, 3, 0, 0, 1)];
        let report = compute_strains(MAP.as_bytes(), Some(&score[..]), Mods::empty()).unwrap();
        let adjusted = report.adjusted.unwrap();
        assert!(adjusted.stars <= report.chart.stars);
        assert!(report.performance.is_some());
        assert!(report.gradual_performance.is_none());
    }

    #[test]
    fn test_strains_with_score_states() {
        let states = [
            stats(1, 1, 0, 0, 0),
            stats(2, 2, 0, 0, 0),
            stats(3, 3, 0, 0, 0),
        ];
        let report = compute_strains(MAP.as_bytes(), Some(&states[..]), Mods::empty()).unwrap();
        let gradual = report.gradual_performance.unwrap();
        assert_eq!(gradual.len(), 3);
        assert_eq!(report.performance.as_ref(), gradual.last());
    }

    #[test]
    fn test_inconsistent_score_is_rejected() {
        let score = [stats(4, 5, 0, 0, 0)];
        let err = compute_strains(MAP.as_bytes(), Some(&score[..]), Mods::empty()).unwrap_err();
        assert!(matches!(err, Error::InconsistentScoreStats(_)));

        let err = compute_strains(MAP.as_bytes(), Some(&[][..]), Mods::empty()).unwrap_err();
        assert!(matches!(err, Error::InconsistentScoreStats(_)));

        // Counts that would wrap a 32-bit sum
        let wrapping = stats(0, u32::MAX, 1, 0, 0);
        let err = compute_attributes(MAP.as_bytes(), Some(wrapping), Mods::empty()).unwrap_err();
        assert!(matches!(err, Error::InconsistentScoreStats(_)));
        let err = compute_strains(MAP.as_bytes(), Some(&[wrapping][..]), Mods::empty()).unwrap_err();
        assert!(matches!(err, Error::InconsistentScoreStats(_)));
    }

    #[test]
    fn test_invalid_config_is_rejected_per_call() {
        let mut config = ParserConfig::default();
        config.strain.section_length = -400.0;
        let parser = Parser::new(config);

        let err = parser.compute_strains(MAP.as_bytes(), None, Mods::empty()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = parser.compute_attributes(MAP.as_bytes(), None, Mods::empty()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_attributes_default_to_ss() {
        let attributes = compute_attributes(MAP.as_bytes(), None, Mods::empty()).unwrap();
        assert_eq!(attributes.performance.accuracy, 1.0);
        assert_eq!(attributes.difficulty.max_combo, 4);

        let played =
            compute_attributes(MAP.as_bytes(), Some(stats(2, 3, 0, 0, 1)), Mods::empty()).unwrap();
        assert!(played.performance.pp < attributes.performance.pp);
    }

    #[test]
    fn test_parser_uses_config() {
        let mut config = ParserConfig::default();
        config.strain.section_length = 100.0;
        let parser = Parser::new(config);

        let tuned = parser.compute_strains(MAP.as_bytes(), None, Mods::empty()).unwrap();
        let default = compute_strains(MAP.as_bytes(), None, Mods::empty()).unwrap();
        assert!(tuned.chart.speed.peaks.len() > default.chart.speed.peaks.len());
    }

    #[test]
    fn test_decode_errors_pass_through() {
        let err = decode_beatmap(b"not a beatmap").unwrap_err();
        assert!(matches!(err, Error::MalformedEncoding { .. }));

        let err = decode_replay(&[]).unwrap_err();
        assert!(matches!(err, Error::UnexpectedEof { .. }));
    }
}
