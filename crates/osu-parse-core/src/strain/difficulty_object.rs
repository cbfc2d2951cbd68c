//! Per-object inputs to the strain skills

use crate::beatmap::{BeatmapRecord, HitObject, Pos2, Slider};
use crate::mods::Mods;

/// Circle radius every distance is normalised to
const NORMALIZED_RADIUS: f64 = 52.0;
/// Radius below which small circles get a distance bonus
const SMALL_CIRCLE_RADIUS: f64 = 30.0;
/// Follow circle radius as a multiple of the circle radius
const FOLLOW_RADIUS_FACTOR: f64 = 3.0;

/// Timing and movement between an object and its predecessor
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyObject {
    /// Index into the beatmap's hit objects
    pub index: usize,
    /// Start time in milliseconds, adjusted for clock rate
    pub start_time: f64,
    /// Time since the previous object, adjusted for clock rate
    pub delta_time: f64,
    /// `delta_time` bounded below by the configured minimum
    pub strain_time: f64,
    /// Normalised distance from the previous cursor position
    pub jump_distance: f64,
    /// Normalised lazy travel distance of the previous slider
    pub travel_distance: f64,
    /// Angle at the previous object, in radians
    pub angle: Option<f64>,
    pub is_spinner: bool,
    /// Stacked head position in osu! pixels
    pub start_pos: Pos2,
    /// Stacked end position in osu! pixels; the tail for sliders
    pub end_pos: Pos2,
    /// Factor turning osu! pixels into normalised distance
    pub scaling_factor: f64,
}

/// Cursor positions an object leaves behind
#[derive(Debug, Clone, Copy)]
struct CursorPath {
    start: Pos2,
    /// Where a lazy cursor ends up; equals `start` for non-sliders
    end: Pos2,
    travel: f64,
}

/// Build difficulty objects for every hit object after the first.
pub fn build_difficulty_objects(
    beatmap: &BeatmapRecord,
    mods: Mods,
    min_strain_time: f64,
) -> Vec<DifficultyObject> {
    let objects = &beatmap.hit_objects;
    if objects.len() < 2 {
        return Vec::new();
    }

    let difficulty = beatmap.difficulty.with_mods(mods);
    let clock_rate = mods.clock_rate();
    let scale = difficulty.scale();
    let radius = f64::from(difficulty.circle_radius());

    let mut scaling_factor = NORMALIZED_RADIUS / radius;
    if radius < SMALL_CIRCLE_RADIUS {
        let small_circle_bonus = (SMALL_CIRCLE_RADIUS - radius).min(5.0) / 50.0;
        scaling_factor *= 1.0 + small_circle_bonus;
    }

    let paths: Vec<CursorPath> = objects
        .iter()
        .map(|obj| cursor_path(obj, scale, radius * FOLLOW_RADIUS_FACTOR))
        .collect();

    (1..objects.len())
        .map(|i| {
            let curr = &objects[i];
            let prev = &objects[i - 1];
            let start_time = curr.start_time / clock_rate;
            let delta_time = (curr.start_time - prev.start_time) / clock_rate;

            let moving = !curr.is_spinner() && !prev.is_spinner();
            let (jump_distance, travel_distance) = if moving {
                let jump = f64::from(paths[i].start.distance(paths[i - 1].end)) * scaling_factor;
                (jump, paths[i - 1].travel * scaling_factor)
            } else {
                (0.0, 0.0)
            };

            let angle = (i >= 2 && moving && !objects[i - 2].is_spinner()).then(|| {
                let v1 = paths[i - 2].end - paths[i - 1].start;
                let v2 = paths[i].start - paths[i - 1].end;
                f64::from(v1.cross(v2)).atan2(f64::from(v1.dot(v2))).abs()
            });

            DifficultyObject {
                index: i,
                start_time,
                delta_time,
                strain_time: delta_time.max(min_strain_time),
                jump_distance,
                travel_distance,
                angle,
                is_spinner: curr.is_spinner(),
                start_pos: paths[i].start,
                end_pos: curr.stacked_end_pos(scale),
                scaling_factor,
            }
        })
        .collect()
}

fn cursor_path(obj: &HitObject, scale: f32, follow_radius: f64) -> CursorPath {
    let start = obj.stacked_pos(scale);
    match obj.slider() {
        Some(slider) => {
            let (end, travel) = lazy_slider_travel(obj, slider, start, follow_radius);
            CursorPath { start, end, travel }
        }
        None => CursorPath {
            start,
            end: start,
            travel: 0.0,
        },
    }
}

/// Follow the slider's ticks, repeats and tail with a cursor that only moves
/// once a point leaves the follow circle.
fn lazy_slider_travel(
    obj: &HitObject,
    slider: &Slider,
    stacked_start: Pos2,
    follow_radius: f64,
) -> (Pos2, f64) {
    let offset = stacked_start - obj.pos;
    let checkpoints = slider.ticks_per_span + 1;
    let mut cursor = stacked_start;
    let mut travel = 0.0;

    for span in 0..slider.slides {
        for k in 1..=checkpoints {
            let progress = f64::from(k) / f64::from(checkpoints);
            let progress = if span % 2 == 0 { progress } else { 1.0 - progress };
            let point = slider.position_at(obj.pos, progress) + offset;

            let diff = point - cursor;
            let dist = f64::from(diff.length());
            if dist > follow_radius {
                let step = dist - follow_radius;
                cursor = cursor + diff.normalize() * step as f32;
                travel += step;
            }
        }
    }

    (cursor, travel)
}
