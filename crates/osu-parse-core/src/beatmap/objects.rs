//! Hit object data structures

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use super::curve::SliderPath;

/// Playfield position in osu!pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pos2 {
    pub x: f32,
    pub y: f32,
}

impl Pos2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product.
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    pub fn normalize(self) -> Self {
        let len = self.length();
        if len > 0.0 {
            self * (1.0 / len)
        } else {
            self
        }
    }
}

impl Add for Pos2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Pos2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Pos2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Slider curve interpolation type, from the leading letter of the curve field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveType {
    Catmull,
    #[default]
    Bezier,
    Linear,
    PerfectCurve,
}

impl CurveType {
    pub fn from_letter(letter: &str) -> Option<Self> {
        match letter {
            "C" => Some(Self::Catmull),
            "B" => Some(Self::Bezier),
            "L" => Some(Self::Linear),
            "P" => Some(Self::PerfectCurve),
            _ => None,
        }
    }
}

/// Slider-specific geometry and timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slider {
    pub curve_type: CurveType,
    /// Control points including the head position as the first entry
    pub control_points: Vec<Pos2>,
    /// Number of spans (1 = no repeat)
    pub slides: u32,
    /// Visual length in osu!pixels
    pub pixel_len: f64,
    pub edge_sounds: Vec<u8>,
    /// Duration of a single span in milliseconds
    pub span_duration: f64,
    /// Slider ticks per span
    pub ticks_per_span: u32,
    /// Tessellated path, only present after the extra decode
    pub path: Option<SliderPath>,
}

impl Slider {
    pub fn repeats(&self) -> u32 {
        self.slides.saturating_sub(1)
    }

    /// Position where the slider ball ends up.
    pub fn end_pos(&self, head: Pos2) -> Pos2 {
        if self.slides % 2 == 0 {
            return head;
        }
        match &self.path {
            Some(path) => path.end(),
            None => self.control_points.last().copied().unwrap_or(head),
        }
    }

    /// Position on the path at `progress` (0..=1) along a single span.
    pub fn position_at(&self, head: Pos2, progress: f64) -> Pos2 {
        match &self.path {
            Some(path) => path.position_at(progress),
            None => {
                let end = self.control_points.last().copied().unwrap_or(head);
                head.lerp(end, progress.clamp(0.0, 1.0) as f32)
            }
        }
    }
}

/// Kind-specific data of a hit object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HitObjectKind {
    Circle,
    Slider(Slider),
    Spinner,
    /// osu!mania hold note
    Hold,
    /// Unsupported type bits; keeps position and timing only
    Unknown { type_bits: u8 },
}

/// A single hit object, normalized to ascending start time after decode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitObject {
    pub pos: Pos2,
    pub start_time: f64,
    pub end_time: f64,
    pub new_combo: bool,
    pub combo_offset: u8,
    pub hit_sound: u8,
    pub kind: HitObjectKind,
    /// Stack height, only resolved by the extra decode
    pub stack_height: i32,
}

impl HitObject {
    pub fn is_circle(&self) -> bool {
        matches!(self.kind, HitObjectKind::Circle)
    }

    pub fn is_slider(&self) -> bool {
        matches!(self.kind, HitObjectKind::Slider(_))
    }

    pub fn is_spinner(&self) -> bool {
        matches!(self.kind, HitObjectKind::Spinner)
    }

    pub fn slider(&self) -> Option<&Slider> {
        match &self.kind {
            HitObjectKind::Slider(slider) => Some(slider),
            _ => None,
        }
    }

    /// Whether the object spans time (spinner or hold) rather than being hit once.
    pub fn is_sustained(&self) -> bool {
        matches!(self.kind, HitObjectKind::Spinner | HitObjectKind::Hold)
    }

    pub fn end_pos(&self) -> Pos2 {
        match &self.kind {
            HitObjectKind::Slider(slider) => slider.end_pos(self.pos),
            _ => self.pos,
        }
    }

    /// Position shifted by the stack offset for the given object scale.
    pub fn stacked_pos(&self, scale: f32) -> Pos2 {
        self.pos + stack_offset(self.stack_height, scale)
    }

    pub fn stacked_end_pos(&self, scale: f32) -> Pos2 {
        self.end_pos() + stack_offset(self.stack_height, scale)
    }

    /// How much combo the object is worth when fully hit.
    ///
    /// Sliders count the head, every tick, every repeat and the tail.
    pub fn combo_weight(&self) -> u32 {
        match &self.kind {
            HitObjectKind::Slider(slider) => {
                let ticks = slider.ticks_per_span.saturating_mul(slider.slides);
                ticks.saturating_add(slider.repeats()).saturating_add(2)
            }
            _ => 1,
        }
    }
}

fn stack_offset(stack_height: i32, scale: f32) -> Pos2 {
    let offset = stack_height as f32 * scale * -6.4;
    Pos2::new(offset, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slider(slides: u32, ticks: u32) -> HitObject {
        HitObject {
            pos: Pos2::new(0.0, 0.0),
            start_time: 0.0,
            end_time: 500.0,
            new_combo: true,
            combo_offset: 0,
            hit_sound: 0,
            kind: HitObjectKind::Slider(Slider {
                curve_type: CurveType::Linear,
                control_points: vec![Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0)],
                slides,
                pixel_len: 100.0,
                edge_sounds: Vec::new(),
                span_duration: 500.0 / slides as f64,
                ticks_per_span: ticks,
                path: None,
            }),
            stack_height: 0,
        }
    }

    #[test]
    fn test_pos_math() {
        let a = Pos2::new(3.0, 4.0);
        assert!((a.length() - 5.0).abs() < 1e-6);
        assert!((a.distance(Pos2::default()) - 5.0).abs() < 1e-6);
        assert_eq!(a.lerp(Pos2::new(5.0, 4.0), 0.5), Pos2::new(4.0, 4.0));
        assert!((Pos2::new(1.0, 0.0).cross(Pos2::new(0.0, 1.0)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_slider_combo_weight() {
        // head + 2 ticks + tail
        assert_eq!(slider(1, 2).combo_weight(), 4);
        // head + 2*2 ticks + 1 repeat + tail
        assert_eq!(slider(2, 2).combo_weight(), 7);
    }

    #[test]
    fn test_slider_end_pos_depends_on_span_parity() {
        assert_eq!(slider(1, 0).end_pos(), Pos2::new(100.0, 0.0));
        assert_eq!(slider(2, 0).end_pos(), Pos2::new(0.0, 0.0));
    }

    #[test]
    fn test_stacked_pos_moves_up_left() {
        let mut obj = slider(1, 0);
        obj.stack_height = 2;
        let stacked = obj.stacked_pos(0.5);
        assert!((stacked.x + 6.4).abs() < 1e-5);
        assert!((stacked.y + 6.4).abs() < 1e-5);
    }

    #[test]
    fn test_curve_type_letters() {
        assert_eq!(CurveType::from_letter("B"), Some(CurveType::Bezier));
        assert_eq!(CurveType::from_letter("P"), Some(CurveType::PerfectCurve));
        assert_eq!(CurveType::from_letter("X"), None);
    }
}
