//! Performance points from difficulty attributes and a score state

use crate::mods::Mods;
use crate::resolve::ScoreStatsRecord;

use super::config::StrainConfig;
use super::engine::{base_flashlight_performance, base_performance};
use super::{DifficultyAttributes, PerformanceAttributes};

const PERFORMANCE_BASE_MULTIPLIER: f64 = 1.12;
/// Share of sliders assumed hard enough for their ends to be dropped
const DIFFICULT_SLIDER_SHARE: f64 = 0.15;

/// Score state the formulas work on
#[derive(Debug, Clone, Copy)]
struct ScoreState {
    combo: f64,
    n300: f64,
    n100: f64,
    n50: f64,
    misses: f64,
}

impl ScoreState {
    fn total_hits(&self) -> f64 {
        self.n300 + self.n100 + self.n50 + self.misses
    }

    fn accuracy(&self) -> f64 {
        let total = self.total_hits();
        if total <= 0.0 {
            return 0.0;
        }
        ((self.n300 * 300.0 + self.n100 * 100.0 + self.n50 * 50.0) / (total * 300.0)).clamp(0.0, 1.0)
    }
}

/// Misses plus the combo breaks a short max combo implies.
///
/// On maps with sliders a max combo well below the full combo means slider
/// ends were dropped, which the judgement counts alone do not show.
fn effective_miss_count(attributes: &DifficultyAttributes, state: &ScoreState) -> f64 {
    let n_sliders = f64::from(attributes.n_sliders);
    let mut combo_based = 0.0;
    if n_sliders > 0.0 {
        let full_combo_threshold = f64::from(attributes.max_combo) - 0.1 * n_sliders;
        if state.combo < full_combo_threshold {
            combo_based = full_combo_threshold / state.combo.max(1.0);
        }
    }

    combo_based
        .min(state.n100 + state.n50 + state.misses)
        .max(state.misses)
}

/// Performance of `score` on a map with `attributes`.
///
/// Without a score, a full-combo play with only 300s is assumed.
pub fn calculate_performance(
    attributes: &DifficultyAttributes,
    score: Option<&ScoreStatsRecord>,
    mods: Mods,
    config: &StrainConfig,
) -> PerformanceAttributes {
    let objects = attributes.n_circles + attributes.n_sliders + attributes.n_spinners;
    let state = match score {
        Some(score) => ScoreState {
            combo: f64::from(score.max_combo),
            n300: f64::from(score.n300),
            n100: f64::from(score.n100),
            n50: f64::from(score.n50),
            misses: f64::from(score.n_misses),
        },
        None => ScoreState {
            combo: f64::from(attributes.max_combo),
            n300: f64::from(objects),
            n100: 0.0,
            n50: 0.0,
            misses: 0.0,
        },
    };

    let total_hits = state.total_hits();
    let accuracy = state.accuracy();
    if total_hits <= 0.0 {
        return PerformanceAttributes {
            pp: 0.0,
            pp_aim: 0.0,
            pp_speed: 0.0,
            pp_acc: 0.0,
            pp_flashlight: 0.0,
            effective_miss_count: 0.0,
            accuracy,
            stars: attributes.stars,
        };
    }

    let effective_misses = effective_miss_count(attributes, &state);

    let mut multiplier = PERFORMANCE_BASE_MULTIPLIER;
    if mods.contains(Mods::NO_FAIL) {
        multiplier *= (1.0 - 0.02 * effective_misses).max(0.9);
    }
    if mods.contains(Mods::SPUN_OUT) {
        multiplier *= 1.0 - (f64::from(attributes.n_spinners) / total_hits).powf(0.85);
    }

    let calc = Calculator {
        attributes,
        state,
        mods,
        total_hits,
        accuracy,
        effective_misses,
        difficulty_multiplier: config.difficulty_multiplier,
    };
    let pp_aim = calc.aim_value();
    let pp_speed = calc.speed_value();
    let pp_acc = calc.accuracy_value();
    let pp_flashlight = calc.flashlight_value();

    let pp = (pp_aim.powf(1.1) + pp_speed.powf(1.1) + pp_acc.powf(1.1) + pp_flashlight.powf(1.1))
        .powf(1.0 / 1.1)
        * multiplier;

    PerformanceAttributes {
        pp,
        pp_aim,
        pp_speed,
        pp_acc,
        pp_flashlight,
        effective_miss_count: effective_misses,
        accuracy,
        stars: attributes.stars,
    }
}

struct Calculator<'a> {
    attributes: &'a DifficultyAttributes,
    state: ScoreState,
    mods: Mods,
    total_hits: f64,
    accuracy: f64,
    effective_misses: f64,
    difficulty_multiplier: f64,
}

impl Calculator<'_> {
    fn length_bonus(&self) -> f64 {
        let mut bonus = 0.95 + 0.4 * (self.total_hits / 2000.0).min(1.0);
        if self.total_hits > 2000.0 {
            bonus += (self.total_hits / 2000.0).log10() * 0.5;
        }
        bonus
    }

    fn combo_scaling(&self) -> f64 {
        let max_combo = f64::from(self.attributes.max_combo);
        if max_combo > 0.0 {
            (self.state.combo.powf(0.8) / max_combo.powf(0.8)).min(1.0)
        } else {
            1.0
        }
    }

    fn miss_penalty(&self, exponent: f64) -> f64 {
        let misses = self.effective_misses;
        if misses > 0.0 {
            0.97 * (1.0 - (misses / self.total_hits).powf(0.775)).powf(misses.powf(exponent))
        } else {
            1.0
        }
    }

    fn aim_value(&self) -> f64 {
        if self.attributes.aim <= 0.0 {
            return 0.0;
        }

        let ar = self.attributes.ar;
        let length_bonus = self.length_bonus();

        let mut value = base_performance(self.attributes.aim, self.difficulty_multiplier);
        value *= length_bonus;
        value *= self.miss_penalty(1.0);
        value *= self.combo_scaling();

        let ar_factor = if ar > 10.33 {
            0.3 * (ar - 10.33)
        } else if ar < 8.0 {
            0.1 * (8.0 - ar)
        } else {
            0.0
        };
        value *= 1.0 + ar_factor * length_bonus;

        if self.mods.contains(Mods::HIDDEN) {
            value *= 1.0 + 0.04 * (12.0 - ar);
        }

        // Dropped slider ends only cost the slider share of aim difficulty
        let n_sliders = f64::from(self.attributes.n_sliders);
        if n_sliders > 0.0 {
            let difficult_sliders = n_sliders * DIFFICULT_SLIDER_SHARE;
            let state = &self.state;
            let dropped = (state.n100 + state.n50 + state.misses)
                .min(f64::from(self.attributes.max_combo) - state.combo)
                .clamp(0.0, difficult_sliders);
            let ratio = self.attributes.slider_strain_ratio;
            value *= (1.0 - ratio) * (1.0 - dropped / difficult_sliders).powi(3) + ratio;
        }

        value *= 0.5 + self.accuracy / 2.0;
        value *= 0.98 + self.attributes.od.powi(2) / 2500.0;
        value
    }

    fn speed_value(&self) -> f64 {
        let ar = self.attributes.ar;
        let od = self.attributes.od;
        let length_bonus = self.length_bonus();

        let mut value = base_performance(self.attributes.speed, self.difficulty_multiplier);
        value *= length_bonus;
        value *= self.miss_penalty(0.875);
        value *= self.combo_scaling();

        if ar > 10.33 {
            value *= 1.0 + 0.3 * (ar - 10.33) * length_bonus;
        }
        if self.mods.contains(Mods::HIDDEN) {
            value *= 1.0 + 0.04 * (12.0 - ar);
        }

        value *= (0.95 + od * od / 750.0)
            * ((self.accuracy + self.relevant_accuracy()) / 2.0).powf((14.5 - od.max(8.0)) / 2.0);

        let n50_allowance = self.total_hits / 500.0;
        if self.state.n50 >= n50_allowance {
            value *= 0.98_f64.powf(self.state.n50 - n50_allowance);
        }
        value
    }

    /// Accuracy over the objects that are hard to tap, assuming mistakes land there first.
    fn relevant_accuracy(&self) -> f64 {
        let notes = self.attributes.speed_note_count;
        if notes <= 0.0 {
            return 0.0;
        }

        let state = &self.state;
        let easy = self.total_hits - notes;
        let n300 = (state.n300 - easy).max(0.0);
        let n100 = (state.n100 - (easy - state.n300).max(0.0)).max(0.0);
        let n50 = (state.n50 - (easy - state.n300 - state.n100).max(0.0)).max(0.0);

        ((n300 * 6.0 + n100 * 2.0 + n50) / (notes * 6.0)).clamp(0.0, 1.0)
    }

    fn accuracy_value(&self) -> f64 {
        let n_circles = f64::from(self.attributes.n_circles);
        if n_circles <= 0.0 {
            return 0.0;
        }

        let state = &self.state;
        let better_accuracy = (((state.n300 - (self.total_hits - n_circles)) * 6.0
            + state.n100 * 2.0
            + state.n50)
            / (n_circles * 6.0))
            .clamp(0.0, 1.0);

        let mut value = 1.52163_f64.powf(self.attributes.od) * better_accuracy.powi(24) * 2.83;
        value *= (n_circles / 1000.0).powf(0.3).min(1.15);

        if self.mods.contains(Mods::HIDDEN) {
            value *= 1.08;
        }
        if self.mods.contains(Mods::FLASHLIGHT) {
            value *= 1.02;
        }
        value
    }

    fn flashlight_value(&self) -> f64 {
        if !self.mods.contains(Mods::FLASHLIGHT) || self.attributes.flashlight <= 0.0 {
            return 0.0;
        }

        let mut value = base_flashlight_performance(self.attributes.flashlight);
        value *= self.miss_penalty(0.875);
        value *= self.combo_scaling();

        let mut length_factor = 0.7 + 0.1 * (self.total_hits / 200.0).min(1.0);
        if self.total_hits > 200.0 {
            length_factor += 0.2 * ((self.total_hits - 200.0) / 200.0).min(1.0);
        }
        value *= length_factor;

        value *= 0.5 + self.accuracy / 2.0;
        value *= 0.98 + self.attributes.od.powi(2) / 2500.0;
        value
    }
}
