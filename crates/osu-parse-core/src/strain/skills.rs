//! Aim, speed and flashlight skills and their section-peak accumulator

use std::collections::VecDeque;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4, PI};

use serde::{Deserialize, Serialize};

use super::config::SkillConstants;
use super::difficulty_object::DifficultyObject;
use super::StrainPeak;

/// Skill dimension a strain sequence belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillKind {
    Aim,
    Speed,
    Flashlight,
}

const AIM_ANGLE_BONUS_BEGIN: f64 = FRAC_PI_3;
const AIM_TIMING_THRESHOLD: f64 = 107.0;
const AIM_ANGLE_SCALE: f64 = 90.0;

const SINGLE_SPACING_THRESHOLD: f64 = 125.0;
const SPEED_ANGLE_BONUS_BEGIN: f64 = 5.0 * PI / 6.0;
const MIN_SPEED_BONUS: f64 = 75.0;
const MAX_SPEED_BONUS: f64 = 45.0;
const SPEED_BALANCING_FACTOR: f64 = 40.0;

/// Previous objects a flashlight strain looks back on
const FLASHLIGHT_HISTORY: usize = 10;
const FLASHLIGHT_HISTORY_DECAY: f64 = 0.8;
/// Jumps shorter than this (osu! pixels) are readable without seeing far ahead
const FLASHLIGHT_MIN_JUMP: f64 = 75.0;
const FLASHLIGHT_STACK_DISTANCE: f64 = 25.0;

fn apply_diminishing_exp(value: f64) -> f64 {
    value.powf(0.99)
}

/// Raw aim strain of `curr`, before the skill multiplier.
///
/// Without sliders the lazy travel of the previous slider is ignored.
pub(crate) fn aim_strain(
    curr: &DifficultyObject,
    prev: Option<&DifficultyObject>,
    with_sliders: bool,
) -> f64 {
    if curr.is_spinner {
        return 0.0;
    }

    let mut result = 0.0;
    if let (Some(prev), Some(angle)) = (prev, curr.angle) {
        if angle > AIM_ANGLE_BONUS_BEGIN {
            let angle_bonus = ((prev.jump_distance - AIM_ANGLE_SCALE).max(0.0)
                * (angle - AIM_ANGLE_BONUS_BEGIN).sin().powi(2)
                * (curr.jump_distance - AIM_ANGLE_SCALE).max(0.0))
            .sqrt();
            result = 1.5 * apply_diminishing_exp(angle_bonus.max(0.0))
                / prev.strain_time.max(AIM_TIMING_THRESHOLD);
        }
    }

    let jump = apply_diminishing_exp(curr.jump_distance);
    let travel = if with_sliders {
        apply_diminishing_exp(curr.travel_distance)
    } else {
        0.0
    };
    let combined = jump + travel + (travel * jump).sqrt();

    (result + combined / curr.strain_time.max(AIM_TIMING_THRESHOLD))
        .max(combined / curr.strain_time)
}

/// Raw speed strain of `curr`, before the skill multiplier.
pub(crate) fn speed_strain(curr: &DifficultyObject) -> f64 {
    if curr.is_spinner {
        return 0.0;
    }

    let distance = SINGLE_SPACING_THRESHOLD.min(curr.travel_distance + curr.jump_distance);
    let delta_time = curr.delta_time.max(MAX_SPEED_BONUS);

    let mut speed_bonus = 1.0;
    if delta_time < MIN_SPEED_BONUS {
        speed_bonus += ((MIN_SPEED_BONUS - delta_time) / SPEED_BALANCING_FACTOR).powi(2);
    }

    let mut angle_bonus = 1.0;
    if let Some(angle) = curr.angle.filter(|&a| a < SPEED_ANGLE_BONUS_BEGIN) {
        angle_bonus = 1.0 + (1.5 * (SPEED_ANGLE_BONUS_BEGIN - angle)).sin().powi(2) / 3.57;

        if angle < FRAC_PI_2 {
            angle_bonus = 1.28;
            if distance < 90.0 {
                let closeness = ((90.0 - distance) / 10.0).min(1.0);
                if angle < FRAC_PI_4 {
                    angle_bonus += (1.0 - angle_bonus) * closeness;
                } else {
                    angle_bonus += (1.0 - angle_bonus)
                        * closeness
                        * ((FRAC_PI_2 - angle) / FRAC_PI_4).sin();
                }
            }
        }
    }

    (1.0 + (speed_bonus - 1.0) * 0.75)
        * angle_bonus
        * (0.95 + speed_bonus * (distance / SINGLE_SPACING_THRESHOLD).powf(3.5))
        / curr.strain_time
}

/// Raw flashlight strain of `curr`, before the skill multiplier.
///
/// `history` holds the preceding objects, most recent first. Each one adds
/// the distance back to its tail over the time elapsed since, decaying with
/// age; nearly stacked objects count less.
pub(crate) fn flashlight_strain(curr: &DifficultyObject, history: &VecDeque<DifficultyObject>) -> f64 {
    if curr.is_spinner {
        return 0.0;
    }

    let scaling_factor = curr.scaling_factor;
    let mut small_distance_nerf = 1.0;
    let mut cumulative_strain_time = 0.0;
    let mut result = 0.0;
    let mut last = curr;

    for (i, prev) in history.iter().take(FLASHLIGHT_HISTORY).enumerate() {
        if !prev.is_spinner {
            let jump = f64::from(curr.start_pos.distance(prev.end_pos));
            cumulative_strain_time += last.strain_time;

            if i == 0 {
                small_distance_nerf = (jump / FLASHLIGHT_MIN_JUMP).min(1.0);
            }

            let stack_nerf =
                (prev.jump_distance / scaling_factor / FLASHLIGHT_STACK_DISTANCE).min(1.0);
            result += FLASHLIGHT_HISTORY_DECAY.powi(i as i32) * stack_nerf * scaling_factor * jump
                / cumulative_strain_time;
        }
        last = prev;
    }

    (small_distance_nerf * result).powi(2)
}

/// Expected number of objects that are hard to tap, from per-object speed strains.
///
/// Each strain is mapped through a logistic curve relative to the hardest one.
pub(crate) fn speed_note_count(object_strains: &[f64]) -> f64 {
    let max = object_strains.iter().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return 0.0;
    }

    object_strains
        .iter()
        .map(|strain| 1.0 / (1.0 + (-(strain / max * 12.0 - 6.0)).exp()))
        .sum()
}

/// Everything a finished skill leaves behind
#[derive(Debug, Clone)]
pub(crate) struct SkillRun {
    pub peaks: Vec<StrainPeak>,
    /// Section index of every processed object
    pub object_sections: Vec<usize>,
    /// Strain right after every processed object
    pub object_strains: Vec<f64>,
}

/// Exponentially decaying strain with per-section peaks
#[derive(Debug, Clone)]
pub(crate) struct StrainSkill {
    kind: SkillKind,
    with_sliders: bool,
    constants: SkillConstants,
    section_length: f64,
    current_strain: f64,
    current_section_peak: f64,
    current_section_end: Option<f64>,
    prev_start: f64,
    /// Most recent object first
    history: VecDeque<DifficultyObject>,
    peaks: Vec<StrainPeak>,
    object_sections: Vec<usize>,
    object_strains: Vec<f64>,
}

impl StrainSkill {
    pub fn new(kind: SkillKind, constants: SkillConstants, section_length: f64) -> Self {
        Self {
            kind,
            with_sliders: true,
            constants,
            section_length,
            current_strain: 0.0,
            current_section_peak: 0.0,
            current_section_end: None,
            prev_start: 0.0,
            history: VecDeque::with_capacity(FLASHLIGHT_HISTORY),
            peaks: Vec::new(),
            object_sections: Vec::new(),
            object_strains: Vec::new(),
        }
    }

    /// Aim skill that ignores slider travel.
    pub fn aim_without_sliders(constants: SkillConstants, section_length: f64) -> Self {
        Self {
            with_sliders: false,
            ..Self::new(SkillKind::Aim, constants, section_length)
        }
    }

    pub fn process(&mut self, curr: &DifficultyObject) {
        let section_length = self.section_length;
        let mut section_end = *self
            .current_section_end
            .get_or_insert_with(|| (curr.start_time / section_length).ceil() * section_length);

        while curr.start_time > section_end {
            self.save_current_peak(section_end);
            // The new section starts with whatever strain survived until its start
            self.current_section_peak =
                self.current_strain * self.constants.decay(section_end - self.prev_start);
            section_end += self.section_length;
        }
        self.current_section_end = Some(section_end);

        let raw = match self.kind {
            SkillKind::Aim => aim_strain(curr, self.history.front(), self.with_sliders),
            SkillKind::Speed => speed_strain(curr),
            SkillKind::Flashlight => flashlight_strain(curr, &self.history),
        };
        self.current_strain *= self.constants.decay(curr.strain_time);
        self.current_strain += raw * self.constants.skill_multiplier;
        self.current_section_peak = self.current_section_peak.max(self.current_strain);

        self.object_sections.push(self.peaks.len());
        self.object_strains.push(self.current_strain);
        self.prev_start = curr.start_time;

        if self.history.len() == FLASHLIGHT_HISTORY {
            self.history.pop_back();
        }
        self.history.push_front(curr.clone());
    }

    fn save_current_peak(&mut self, section_end: f64) {
        self.peaks.push(StrainPeak {
            time: section_end - self.section_length,
            strain: self.current_section_peak,
        });
    }

    /// Peaks so far, including the open section.
    pub fn peaks_with_current(&self) -> Vec<StrainPeak> {
        let mut peaks = self.peaks.clone();
        if let Some(end) = self.current_section_end {
            peaks.push(StrainPeak {
                time: end - self.section_length,
                strain: self.current_section_peak,
            });
        }
        peaks
    }

    pub fn object_strains(&self) -> &[f64] {
        &self.object_strains
    }

    /// Close the open section.
    pub fn finish(mut self) -> SkillRun {
        if let Some(end) = self.current_section_end {
            self.save_current_peak(end);
        }
        SkillRun {
            peaks: self.peaks,
            object_sections: self.object_sections,
            object_strains: self.object_strains,
        }
    }
}

/// Weighted sum of the highest peaks, heaviest first.
pub(crate) fn weighted_difficulty(peaks: &[StrainPeak], decay_weight: f64, top: usize) -> f64 {
    let mut strains: Vec<f64> = peaks.iter().map(|p| p.strain).filter(|s| *s > 0.0).collect();
    strains.sort_by(|a, b| b.total_cmp(a));

    let mut weight = 1.0;
    let mut difficulty = 0.0;
    for strain in strains.into_iter().take(top) {
        difficulty += strain * weight;
        weight *= decay_weight;
    }
    difficulty
}
