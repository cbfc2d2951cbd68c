//! Timing points and control point lookups

use serde::{Deserialize, Serialize};

/// Default beat length when a chart carries no uninherited timing point (120 BPM)
pub const DEFAULT_BEAT_LEN: f64 = 500.0;

/// A timing (uninherited) or velocity (inherited) control point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingPoint {
    /// Offset in milliseconds
    pub time: f64,
    /// Milliseconds per beat for uninherited points, negative inverse
    /// slider velocity percentage for inherited points
    pub beat_len: f64,
    /// Beats per measure
    pub meter: u32,
    pub sample_set: u8,
    pub sample_index: u32,
    pub volume: u8,
    pub uninherited: bool,
    pub kiai: bool,
    pub omit_first_barline: bool,
}

impl TimingPoint {
    /// Slider velocity multiplier of an inherited point.
    pub fn slider_velocity(&self) -> f64 {
        if self.uninherited || self.beat_len >= 0.0 {
            1.0
        } else {
            (-100.0 / self.beat_len).clamp(0.1, 10.0)
        }
    }

    pub fn bpm(&self) -> Option<f64> {
        (self.uninherited && self.beat_len > 0.0).then(|| 60_000.0 / self.beat_len)
    }
}

/// Beat length in effect at `time`.
///
/// Falls back to the first uninherited point for times before it.
pub fn beat_len_at(points: &[TimingPoint], time: f64) -> f64 {
    let mut uninherited = points.iter().filter(|p| p.uninherited && p.beat_len > 0.0);
    let first = match uninherited.next() {
        Some(point) => point,
        None => return DEFAULT_BEAT_LEN,
    };

    std::iter::once(first)
        .chain(uninherited)
        .take_while(|p| p.time <= time)
        .last()
        .unwrap_or(first)
        .beat_len
}

/// Slider velocity multiplier in effect at `time`.
///
/// An uninherited point resets the velocity to 1.
pub fn slider_velocity_at(points: &[TimingPoint], time: f64) -> f64 {
    points
        .iter()
        .take_while(|p| p.time <= time)
        .last()
        .map(TimingPoint::slider_velocity)
        .unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(time: f64, beat_len: f64, uninherited: bool) -> TimingPoint {
        TimingPoint {
            time,
            beat_len,
            meter: 4,
            sample_set: 0,
            sample_index: 0,
            volume: 100,
            uninherited,
            kiai: false,
            omit_first_barline: false,
        }
    }

    #[test]
    fn test_beat_len_lookup() {
        let points = vec![
            point(1000.0, 500.0, true),
            point(2000.0, -50.0, false),
            point(3000.0, 300.0, true),
        ];
        assert_eq!(beat_len_at(&points, 0.0), 500.0);
        assert_eq!(beat_len_at(&points, 2500.0), 500.0);
        assert_eq!(beat_len_at(&points, 3000.0), 300.0);
        assert_eq!(beat_len_at(&[], 100.0), DEFAULT_BEAT_LEN);
    }

    #[test]
    fn test_slider_velocity_lookup() {
        let points = vec![
            point(1000.0, 500.0, true),
            point(2000.0, -50.0, false),
            point(3000.0, 300.0, true),
        ];
        assert_eq!(slider_velocity_at(&points, 500.0), 1.0);
        assert_eq!(slider_velocity_at(&points, 2500.0), 2.0);
        assert_eq!(slider_velocity_at(&points, 3500.0), 1.0);
    }

    #[test]
    fn test_bpm() {
        assert_eq!(point(0.0, 500.0, true).bpm(), Some(120.0));
        assert_eq!(point(0.0, -100.0, false).bpm(), None);
    }
}
