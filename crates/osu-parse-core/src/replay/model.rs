//! Replay data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::beatmap::GameMode;
use crate::mods::Mods;

use super::frames::FrameStream;

/// Windows ticks (100ns units since 0001-01-01) at the Unix epoch
const TICKS_AT_UNIX_EPOCH: i64 = 621_355_968_000_000_000;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Judgement counts as stored in the replay header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgements {
    pub count_300: u16,
    pub count_100: u16,
    pub count_50: u16,
    pub count_geki: u16,
    pub count_katu: u16,
    pub count_miss: u16,
}

impl Judgements {
    /// Accuracy in the range 0.0 to 100.0 using the mode's weighting.
    pub fn accuracy(&self, mode: GameMode) -> f64 {
        let n300 = f64::from(self.count_300);
        let n100 = f64::from(self.count_100);
        let n50 = f64::from(self.count_50);
        let geki = f64::from(self.count_geki);
        let katu = f64::from(self.count_katu);
        let miss = f64::from(self.count_miss);

        let (hit, total) = match mode {
            GameMode::Osu => (
                n300 * 300.0 + n100 * 100.0 + n50 * 50.0,
                (n300 + n100 + n50 + miss) * 300.0,
            ),
            GameMode::Taiko => (n300 + n100 * 0.5, n300 + n100 + miss),
            GameMode::Catch => (n300 + n100 + n50, n300 + n100 + n50 + katu + miss),
            GameMode::Mania => (
                (n300 + geki) * 300.0 + katu * 200.0 + n100 * 100.0 + n50 * 50.0,
                (n300 + geki + katu + n100 + n50 + miss) * 300.0,
            ),
        };

        if total > 0.0 {
            hit / total * 100.0
        } else {
            0.0
        }
    }

    /// Letter grade of the play.
    ///
    /// osu!standard uses the hit-ratio rules; other modes fall back to
    /// accuracy thresholds.
    pub fn grade(&self, mode: GameMode, mods: Mods) -> Grade {
        let silver = mods.intersects(Mods::HIDDEN | Mods::FLASHLIGHT | Mods::FADE_IN);
        let accuracy = self.accuracy(mode);

        let grade = match mode {
            GameMode::Osu => self.standard_grade(),
            _ => {
                if accuracy >= 100.0 {
                    Grade::SS
                } else if accuracy >= 95.0 {
                    Grade::S
                } else if accuracy >= 90.0 {
                    Grade::A
                } else if accuracy >= 80.0 {
                    Grade::B
                } else if accuracy >= 70.0 {
                    Grade::C
                } else {
                    Grade::D
                }
            }
        };

        match (grade, silver) {
            (Grade::SS, true) => Grade::SSilver,
            (Grade::S, true) => Grade::SSilver2,
            (grade, _) => grade,
        }
    }

    fn standard_grade(&self) -> Grade {
        let total = u32::from(self.count_300)
            + u32::from(self.count_100)
            + u32::from(self.count_50)
            + u32::from(self.count_miss);
        if total == 0 {
            return Grade::D;
        }

        let ratio300 = f64::from(self.count_300) / f64::from(total);
        let ratio50 = f64::from(self.count_50) / f64::from(total);
        let no_miss = self.count_miss == 0;

        if ratio300 >= 1.0 {
            Grade::SS
        } else if ratio300 > 0.9 && ratio50 < 0.01 && no_miss {
            Grade::S
        } else if (ratio300 > 0.8 && no_miss) || ratio300 > 0.9 {
            Grade::A
        } else if (ratio300 > 0.7 && no_miss) || ratio300 > 0.8 {
            Grade::B
        } else if ratio300 > 0.6 {
            Grade::C
        } else {
            Grade::D
        }
    }
}

/// Grade/rank achieved on a play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    SS,
    SSilver, // SS with hidden/flashlight
    S,
    SSilver2, // S with hidden/flashlight
    A,
    B,
    C,
    D,
}

impl Grade {
    /// Get display string
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::SS => "SS",
            Grade::SSilver => "SS",
            Grade::S => "S",
            Grade::SSilver2 => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A point on the health bar graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifeGraphPoint {
    /// Milliseconds into the play
    pub time: i32,
    /// Health from 0.0 to 1.0
    pub life: f64,
}

/// A decoded `.osr` replay
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayRecord {
    pub mode: GameMode,
    /// Game version that wrote the replay, `yyyymmdd`
    pub version: i32,
    /// MD5 of the beatmap the play was made on
    pub beatmap_hash: String,
    pub player_name: String,
    pub replay_hash: Option<String>,
    pub judgements: Judgements,
    pub score: i32,
    pub max_combo: u16,
    /// Full combo flag
    pub perfect: bool,
    pub mods: Mods,
    pub life_graph: Vec<LifeGraphPoint>,
    /// Windows ticks
    pub timestamp: i64,
    pub online_score_id: Option<i64>,
    /// Only present with the target practice mod
    pub target_practice_accuracy: Option<f64>,
    pub frames: FrameStream,
}

impl ReplayRecord {
    /// Play time as UTC, `None` when the ticks fall outside chrono's range.
    pub fn played_at(&self) -> Option<DateTime<Utc>> {
        let since_epoch = self.timestamp.checked_sub(TICKS_AT_UNIX_EPOCH)?;
        let secs = since_epoch.div_euclid(TICKS_PER_SECOND);
        let nanos = since_epoch.rem_euclid(TICKS_PER_SECOND) * 100;
        DateTime::from_timestamp(secs, nanos as u32)
    }

    pub fn accuracy(&self) -> f64 {
        self.judgements.accuracy(self.mode)
    }

    pub fn grade(&self) -> Grade {
        self.judgements.grade(self.mode, self.mods)
    }
}
