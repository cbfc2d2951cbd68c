//! Gameplay mod bitset

use serde::{Deserialize, Serialize};

/// Applied mods as stored in replays and score data
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mods(u32);

bitflags::bitflags! {
    impl Mods: u32 {
        const NO_FAIL = 1;
        const EASY = 1 << 1;
        const TOUCH_DEVICE = 1 << 2;
        const HIDDEN = 1 << 3;
        const HARD_ROCK = 1 << 4;
        const SUDDEN_DEATH = 1 << 5;
        const DOUBLE_TIME = 1 << 6;
        const RELAX = 1 << 7;
        const HALF_TIME = 1 << 8;
        const NIGHTCORE = 1 << 9;
        const FLASHLIGHT = 1 << 10;
        const AUTOPLAY = 1 << 11;
        const SPUN_OUT = 1 << 12;
        const AUTOPILOT = 1 << 13;
        const PERFECT = 1 << 14;
        const KEY4 = 1 << 15;
        const KEY5 = 1 << 16;
        const KEY6 = 1 << 17;
        const KEY7 = 1 << 18;
        const KEY8 = 1 << 19;
        const FADE_IN = 1 << 20;
        const RANDOM = 1 << 21;
        const CINEMA = 1 << 22;
        const TARGET_PRACTICE = 1 << 23;
        const KEY9 = 1 << 24;
        const KEY_COOP = 1 << 25;
        const KEY1 = 1 << 26;
        const KEY3 = 1 << 27;
        const KEY2 = 1 << 28;
        const SCORE_V2 = 1 << 29;
        const MIRROR = 1 << 30;
    }
}

impl Mods {
    /// Playback speed multiplier.
    pub fn clock_rate(self) -> f64 {
        if self.intersects(Mods::DOUBLE_TIME | Mods::NIGHTCORE) {
            1.5
        } else if self.contains(Mods::HALF_TIME) {
            0.75
        } else {
            1.0
        }
    }

    /// Multiplier for CS, AR, OD and HP (CS uses its own factor under HR).
    pub fn od_ar_hp_multiplier(self) -> f32 {
        if self.contains(Mods::HARD_ROCK) {
            1.4
        } else if self.contains(Mods::EASY) {
            0.5
        } else {
            1.0
        }
    }

    pub fn cs_multiplier(self) -> f32 {
        if self.contains(Mods::HARD_ROCK) {
            1.3
        } else if self.contains(Mods::EASY) {
            0.5
        } else {
            1.0
        }
    }
}
