//! Cross-referencing replays and score data against a beatmap
//!
//! Produces one [`AnnotatedHitObject`] per hit object, either by matching
//! replay frames against hit windows or by distributing judgement counts
//! over the chart.

mod frames;
mod score_stats;

use serde::{Deserialize, Serialize};

use crate::beatmap::{BeatmapRecord, HitObject};
use crate::error::{Error, Result};
use crate::mods::Mods;
use crate::replay::InputFrame;

pub use score_stats::{allocate_score_stats, annotate_score_states};

/// Judgement tier of a single object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitResult {
    Great,
    Ok,
    Meh,
    Miss,
}

impl HitResult {
    pub fn is_hit(self) -> bool {
        self != HitResult::Miss
    }
}

/// A hit object paired with its resolved outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedHitObject {
    /// Position of the object in the beatmap's hit object list
    pub index: usize,
    pub object: HitObject,
    pub result: HitResult,
    /// Frame that judged the object (frame mode only)
    pub frame_index: Option<usize>,
    /// Signed offset of that frame from the object's start time, in milliseconds
    pub time_offset: Option<f64>,
}

impl AnnotatedHitObject {
    pub(crate) fn new(index: usize, object: &HitObject, result: HitResult) -> Self {
        Self {
            index,
            object: object.clone(),
            result,
            frame_index: None,
            time_offset: None,
        }
    }
}

/// Judgement counts of a score, without frames
///
/// Also used as one entry of a cumulative score-state sequence, where each
/// entry holds the totals after one more object was processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreStatsRecord {
    pub max_combo: u32,
    pub n_geki: u32,
    pub n_katu: u32,
    pub n300: u32,
    pub n100: u32,
    pub n50: u32,
    pub n_misses: u32,
}

impl ScoreStatsRecord {
    /// Number of judged objects (geki and katu are counted within 300/100).
    ///
    /// Summed in 64 bits so that untrusted counts cannot wrap.
    pub fn judged(&self) -> u64 {
        [self.n300, self.n100, self.n50, self.n_misses]
            .into_iter()
            .map(u64::from)
            .sum()
    }
}

/// Tuning for frame matching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Multiplier applied to the circle radius when testing cursor position
    pub radius_scale: f32,
    /// Only frames with a hit button held can judge an object
    pub require_press: bool,
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.radius_scale.is_finite() && self.radius_scale > 0.0) {
            return Err(Error::Config(format!(
                "invalid resolver setting radius_scale: {}",
                self.radius_scale
            )));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            radius_scale: 1.0,
            require_press: false,
        }
    }
}

/// What to resolve the beatmap against
#[derive(Debug, Clone, Copy)]
pub enum ResolveInput<'a> {
    /// Replay frames in decode order, with the mods of the play
    Frames { frames: &'a [InputFrame], mods: Mods },
    /// Final judgement counts of a score
    ScoreStats(&'a ScoreStatsRecord),
    /// Cumulative score states, one per processed object
    ScoreStates(&'a [ScoreStatsRecord]),
}

/// Annotate every object of `beatmap` from the given input.
pub fn resolve(
    beatmap: &BeatmapRecord,
    input: ResolveInput<'_>,
    config: &ResolverConfig,
) -> Result<Vec<AnnotatedHitObject>> {
    let annotations = match input {
        ResolveInput::Frames { frames, mods } => {
            frames::resolve_frames(beatmap, frames, mods, config)
        }
        ResolveInput::ScoreStats(stats) => allocate_score_stats(&beatmap.hit_objects, stats)?,
        ResolveInput::ScoreStates(states) => annotate_score_states(&beatmap.hit_objects, states)?,
    };

    tracing::debug!(
        objects = beatmap.hit_objects.len(),
        annotated = annotations.len(),
        misses = annotations.iter().filter(|a| a.result == HitResult::Miss).count(),
        "Resolved hit objects"
    );

    Ok(annotations)
}
