//! Strain, star rating and performance calculation
//!
//! Each skill keeps an exponentially decaying strain that is bumped once per
//! object; the highest strain within every fixed-length section becomes that
//! section's peak. Ratings come from a weighted sum of the highest peaks.

mod config;
mod difficulty_object;
mod engine;
mod performance;
mod skills;

use serde::Serialize;

use crate::beatmap::GameMode;

pub use config::{OutcomeCredit, SkillConstants, StrainConfig};
pub use difficulty_object::{build_difficulty_objects, DifficultyObject};
pub use engine::{
    adjust_sequence, check_section_count, compute_chart, gradual_difficulty, ChartStrains,
};
pub use performance::calculate_performance;
pub use skills::SkillKind;

/// Highest strain within one section
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrainPeak {
    /// Section start in milliseconds, adjusted for clock rate
    pub time: f64,
    pub strain: f64,
}

/// Section peaks of one skill and the rating derived from them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillStrains {
    pub kind: SkillKind,
    pub peaks: Vec<StrainPeak>,
    /// Weighted sum of the highest peaks
    pub difficulty: f64,
    pub rating: f64,
}

/// Strain peaks of every evaluated skill plus the combined star rating
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrainSequence {
    /// Absent for modes other than osu!standard
    pub aim: Option<SkillStrains>,
    pub speed: SkillStrains,
    /// Absent for modes other than osu!standard; only counts towards stars with the mod
    pub flashlight: Option<SkillStrains>,
    pub stars: f64,
}

/// Difficulty of a beatmap under a set of mods
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifficultyAttributes {
    pub mode: GameMode,
    pub aim: f64,
    pub speed: f64,
    pub flashlight: f64,
    /// Aim rating without slider travel over the full aim rating
    pub slider_strain_ratio: f64,
    /// Expected number of objects that are hard to tap
    pub speed_note_count: f64,
    pub stars: f64,
    /// Effective approach rate including clock rate
    pub ar: f64,
    /// Effective overall difficulty including clock rate
    pub od: f64,
    pub hp: f64,
    pub cs: f64,
    pub clock_rate: f64,
    pub n_circles: u32,
    pub n_sliders: u32,
    pub n_spinners: u32,
    pub max_combo: u32,
}

/// Performance points of a score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceAttributes {
    pub pp: f64,
    pub pp_aim: f64,
    pub pp_speed: f64,
    pub pp_acc: f64,
    pub pp_flashlight: f64,
    /// Misses plus combo breaks inferred from a short max combo
    pub effective_miss_count: f64,
    /// Accuracy in the range 0.0 to 1.0
    pub accuracy: f64,
    pub stars: f64,
}

/// Output of a strain computation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrainReport {
    pub difficulty: DifficultyAttributes,
    /// Peaks of the chart alone
    pub chart: StrainSequence,
    /// Peaks re-weighted by the outcome of each object, when score data was given
    pub adjusted: Option<StrainSequence>,
    pub performance: Option<PerformanceAttributes>,
    /// One entry per cumulative score state
    pub gradual_performance: Option<Vec<PerformanceAttributes>>,
}

/// Difficulty and performance of a beatmap
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeatmapAttributes {
    pub difficulty: DifficultyAttributes,
    pub performance: PerformanceAttributes,
}
