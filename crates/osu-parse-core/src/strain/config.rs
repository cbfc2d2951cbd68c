//! Tunable constants of the strain engine

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::resolve::HitResult;

/// Per-skill strain constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillConstants {
    /// Scales each object's strain contribution
    pub skill_multiplier: f64,
    /// Fraction of strain left after one second
    pub strain_decay_base: f64,
}

/// Performance credit of each judgement tier, used for the adjusted sequence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeCredit {
    pub great: f64,
    pub ok: f64,
    pub meh: f64,
    pub miss: f64,
}

impl Default for OutcomeCredit {
    fn default() -> Self {
        Self {
            great: 1.0,
            ok: 0.8,
            meh: 0.5,
            miss: 0.0,
        }
    }
}

impl OutcomeCredit {
    pub fn of(&self, result: HitResult) -> f64 {
        match result {
            HitResult::Great => self.great,
            HitResult::Ok => self.ok,
            HitResult::Meh => self.meh,
            HitResult::Miss => self.miss,
        }
    }
}

/// Strain engine configuration
///
/// Defaults reproduce the osu!standard reference constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrainConfig {
    /// Length of a strain section in milliseconds
    pub section_length: f64,
    /// Weight falloff between consecutive sorted peaks
    pub decay_weight: f64,
    /// Number of highest peaks that count towards a rating
    pub top_peaks: usize,
    /// Scales the square root of the weighted peak sum into a rating
    pub difficulty_multiplier: f64,
    /// Exponent of the power mean combining skill ratings into stars
    pub star_exponent: f64,
    /// Lower bound on the time between objects, in milliseconds
    pub min_strain_time: f64,
    pub aim: SkillConstants,
    pub speed: SkillConstants,
    pub flashlight: SkillConstants,
    /// Weight falloff between sorted flashlight peaks; every peak counts
    pub flashlight_decay_weight: f64,
    pub outcome_credit: OutcomeCredit,
}

impl Default for StrainConfig {
    fn default() -> Self {
        Self {
            section_length: 400.0,
            decay_weight: 0.9,
            top_peaks: 100,
            difficulty_multiplier: 0.0675,
            star_exponent: 1.1,
            min_strain_time: 25.0,
            aim: SkillConstants {
                skill_multiplier: 26.25,
                strain_decay_base: 0.15,
            },
            speed: SkillConstants {
                skill_multiplier: 1400.0,
                strain_decay_base: 0.3,
            },
            flashlight: SkillConstants {
                skill_multiplier: 0.15,
                strain_decay_base: 0.15,
            },
            flashlight_decay_weight: 1.0,
            outcome_credit: OutcomeCredit::default(),
        }
    }
}

impl SkillConstants {
    /// Strain multiplier after `ms` milliseconds.
    pub fn decay(&self, ms: f64) -> f64 {
        self.strain_decay_base.powf(ms / 1000.0)
    }

    fn validate(&self, skill: &str) -> Result<()> {
        if !(self.skill_multiplier.is_finite() && self.skill_multiplier >= 0.0) {
            return Err(invalid(&format!("{}.skill_multiplier", skill), self.skill_multiplier));
        }
        if !(self.strain_decay_base > 0.0 && self.strain_decay_base < 1.0) {
            return Err(invalid(&format!("{}.strain_decay_base", skill), self.strain_decay_base));
        }
        Ok(())
    }
}

impl StrainConfig {
    /// Reject values that would stall section splitting or produce NaN ratings.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("section_length", self.section_length),
            ("min_strain_time", self.min_strain_time),
            ("difficulty_multiplier", self.difficulty_multiplier),
            ("star_exponent", self.star_exponent),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(name, value));
            }
        }

        for (name, value) in [
            ("decay_weight", self.decay_weight),
            ("flashlight_decay_weight", self.flashlight_decay_weight),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(invalid(name, value));
            }
        }

        if self.top_peaks == 0 {
            return Err(Error::Config("top_peaks must be at least 1".to_string()));
        }

        self.aim.validate("aim")?;
        self.speed.validate("speed")?;
        self.flashlight.validate("flashlight")?;

        let credit = &self.outcome_credit;
        for (name, value) in [
            ("outcome_credit.great", credit.great),
            ("outcome_credit.ok", credit.ok),
            ("outcome_credit.meh", credit.meh),
            ("outcome_credit.miss", credit.miss),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid(name, value));
            }
        }

        Ok(())
    }
}

fn invalid(name: &str, value: f64) -> Error {
    Error::Config(format!("invalid strain setting {}: {}", name, value))
}
