//! Slider path tessellation

use serde::{Deserialize, Serialize};

use super::objects::{CurveType, Pos2};

/// Maximum distance between the true arc and its chords, in osu!pixels.
const CIRCLE_TOLERANCE: f32 = 0.1;
const CATMULL_DETAIL: usize = 50;
/// Target spacing between bezier samples, in osu!pixels.
const BEZIER_SAMPLE_SPACING: f32 = 2.5;
const MAX_SEGMENT_SAMPLES: usize = 1000;

/// A sampled slider path with cumulative arc lengths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliderPath {
    pub points: Vec<Pos2>,
    /// Arc length from the start up to each point
    pub cumulative_length: Vec<f64>,
}

impl SliderPath {
    /// Tessellate `control_points` and fit the result to `expected_len`.
    ///
    /// A non-positive `expected_len` keeps the natural path length.
    pub fn compute(curve_type: CurveType, control_points: &[Pos2], expected_len: f64) -> Self {
        let mut points = tessellate(curve_type, control_points);
        if points.is_empty() {
            points.push(control_points.first().copied().unwrap_or_default());
        }

        let mut path = Self::from_points(points);
        if expected_len > 0.0 {
            path.fit_length(expected_len);
        }
        path
    }

    fn from_points(points: Vec<Pos2>) -> Self {
        let mut cumulative_length = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, point) in points.iter().enumerate() {
            if i > 0 {
                total += f64::from(point.distance(points[i - 1]));
            }
            cumulative_length.push(total);
        }
        Self {
            points,
            cumulative_length,
        }
    }

    pub fn length(&self) -> f64 {
        self.cumulative_length.last().copied().unwrap_or(0.0)
    }

    pub fn start(&self) -> Pos2 {
        self.points.first().copied().unwrap_or_default()
    }

    pub fn end(&self) -> Pos2 {
        self.points.last().copied().unwrap_or_default()
    }

    /// Position at `progress` (0..=1) of the total length.
    pub fn position_at(&self, progress: f64) -> Pos2 {
        let target = progress.clamp(0.0, 1.0) * self.length();
        let idx = self
            .cumulative_length
            .partition_point(|&len| len < target);

        if idx == 0 {
            return self.start();
        }
        if idx >= self.points.len() {
            return self.end();
        }

        let (len0, len1) = (self.cumulative_length[idx - 1], self.cumulative_length[idx]);
        let span = len1 - len0;
        let t = if span > 0.0 { (target - len0) / span } else { 0.0 };
        self.points[idx - 1].lerp(self.points[idx], t as f32)
    }

    /// Trim or extend the path so its length equals `expected`.
    fn fit_length(&mut self, expected: f64) {
        let actual = self.length();
        if self.points.len() < 2 {
            return;
        }

        if actual > expected {
            let idx = self.cumulative_length.partition_point(|&len| len < expected);
            let idx = idx.clamp(1, self.points.len() - 1);
            let (len0, len1) = (self.cumulative_length[idx - 1], self.cumulative_length[idx]);
            let span = len1 - len0;
            let t = if span > 0.0 { (expected - len0) / span } else { 0.0 };
            let end = self.points[idx - 1].lerp(self.points[idx], t as f32);

            self.points.truncate(idx);
            self.cumulative_length.truncate(idx);
            self.points.push(end);
            self.cumulative_length.push(expected);
        } else if actual < expected {
            let n = self.points.len();
            let dir = (self.points[n - 1] - self.points[n - 2]).normalize();
            if dir.length() == 0.0 {
                return;
            }
            let end = self.points[n - 1] + dir * (expected - actual) as f32;
            self.points.push(end);
            self.cumulative_length.push(expected);
        }
    }
}

fn tessellate(curve_type: CurveType, control_points: &[Pos2]) -> Vec<Pos2> {
    match control_points.len() {
        0 => return Vec::new(),
        1 => return control_points.to_vec(),
        _ => {}
    }

    match curve_type {
        CurveType::Linear => control_points.to_vec(),
        CurveType::Catmull => catmull(control_points),
        CurveType::PerfectCurve if control_points.len() == 3 => {
            circular_arc(control_points).unwrap_or_else(|| bezier(control_points))
        }
        CurveType::PerfectCurve | CurveType::Bezier => bezier(control_points),
    }
}

/// Bezier with segment splits at repeated control points.
fn bezier(control_points: &[Pos2]) -> Vec<Pos2> {
    let mut output = Vec::new();
    let mut start = 0;

    for i in 1..=control_points.len() {
        let at_end = i == control_points.len();
        if at_end || control_points[i] == control_points[i - 1] {
            let segment = &control_points[start..i];
            if segment.len() > 1 {
                append_dedup(&mut output, bezier_segment(segment));
            } else if let Some(&p) = segment.first() {
                append_dedup(&mut output, vec![p]);
            }
            start = i;
        }
    }

    output
}

fn bezier_segment(segment: &[Pos2]) -> Vec<Pos2> {
    if segment.len() == 2 {
        return segment.to_vec();
    }

    let polygon_len: f32 = segment.windows(2).map(|w| w[0].distance(w[1])).sum();
    let samples = ((polygon_len / BEZIER_SAMPLE_SPACING).ceil() as usize).clamp(2, MAX_SEGMENT_SAMPLES);

    let mut scratch = vec![Pos2::default(); segment.len()];
    (0..=samples)
        .map(|s| de_casteljau(segment, s as f32 / samples as f32, &mut scratch))
        .collect()
}

fn de_casteljau(points: &[Pos2], t: f32, scratch: &mut [Pos2]) -> Pos2 {
    scratch.copy_from_slice(points);
    let n = points.len();
    for level in 1..n {
        for i in 0..n - level {
            scratch[i] = scratch[i].lerp(scratch[i + 1], t);
        }
    }
    scratch[0]
}

fn catmull(control_points: &[Pos2]) -> Vec<Pos2> {
    let n = control_points.len();
    let mut output = Vec::with_capacity((n - 1) * (CATMULL_DETAIL + 1));

    for i in 0..n - 1 {
        let v2 = control_points[i];
        let v1 = if i > 0 { control_points[i - 1] } else { v2 };
        let v3 = control_points[i + 1];
        let v4 = if i + 2 < n {
            control_points[i + 2]
        } else {
            v3 * 2.0 - v2
        };

        let segment: Vec<Pos2> = (0..=CATMULL_DETAIL)
            .map(|c| catmull_point(v1, v2, v3, v4, c as f32 / CATMULL_DETAIL as f32))
            .collect();
        append_dedup(&mut output, segment);
    }

    output
}

fn catmull_point(v1: Pos2, v2: Pos2, v3: Pos2, v4: Pos2, t: f32) -> Pos2 {
    let t2 = t * t;
    let t3 = t2 * t;
    let component = |a: f32, b: f32, c: f32, d: f32| {
        0.5 * (2.0 * b
            + (-a + c) * t
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * t2
            + (-a + 3.0 * b - 3.0 * c + d) * t3)
    };
    Pos2::new(
        component(v1.x, v2.x, v3.x, v4.x),
        component(v1.y, v2.y, v3.y, v4.y),
    )
}

/// Arc through three points; `None` when they are (nearly) collinear.
fn circular_arc(points: &[Pos2]) -> Option<Vec<Pos2>> {
    let (a, b, c) = (points[0], points[1], points[2]);

    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
    if d.abs() < 1e-3 {
        return None;
    }

    let a_sq = a.dot(a);
    let b_sq = b.dot(b);
    let c_sq = c.dot(c);
    let center = Pos2::new(
        (a_sq * (b.y - c.y) + b_sq * (c.y - a.y) + c_sq * (a.y - b.y)) / d,
        (a_sq * (c.x - b.x) + b_sq * (a.x - c.x) + c_sq * (b.x - a.x)) / d,
    );

    let radius = a.distance(center);
    let theta_start = (a.y - center.y).atan2(a.x - center.x);
    let mut theta_end = (c.y - center.y).atan2(c.x - center.x);

    while theta_end < theta_start {
        theta_end += 2.0 * std::f32::consts::PI;
    }

    let mut dir = 1.0;
    let mut theta_range = theta_end - theta_start;

    // Going the other way round if b is not on the counter-clockwise arc
    let ortho_a_to_c = Pos2::new(c.y - a.y, -(c.x - a.x));
    if ortho_a_to_c.dot(b - a) < 0.0 {
        dir = -1.0;
        theta_range = 2.0 * std::f32::consts::PI - theta_range;
    }

    let amount = if 2.0 * radius <= CIRCLE_TOLERANCE {
        2
    } else {
        let step = 2.0 * (1.0 - CIRCLE_TOLERANCE / radius).acos();
        ((theta_range / step).ceil() as usize).clamp(2, MAX_SEGMENT_SAMPLES)
    };

    Some(
        (0..amount)
            .map(|i| {
                let fract = i as f32 / (amount - 1) as f32;
                let theta = theta_start + dir * fract * theta_range;
                center + Pos2::new(theta.cos(), theta.sin()) * radius
            })
            .collect(),
    )
}

fn append_dedup(output: &mut Vec<Pos2>, segment: Vec<Pos2>) {
    for point in segment {
        if output.last() != Some(&point) {
            output.push(point);
        }
    }
}
