//! Frame-mode resolution: match replay frames against hit windows

use crate::beatmap::{BeatmapRecord, HitObject, HitWindows, Pos2};
use crate::mods::Mods;
use crate::replay::InputFrame;

use super::{AnnotatedHitObject, HitResult, ResolverConfig};

const PLAYFIELD_HEIGHT: f32 = 384.0;

/// A frame together with its index in the decoded frame list
type IndexedFrame<'a> = (usize, &'a InputFrame);

/// Forward pass over objects and time-ordered frames.
///
/// Frames are visited in ascending time; ties keep decode order, and
/// `frame_index` always refers to the decoded frame list. The start of each
/// object's candidate range only moves forward, so the cost is
/// O(objects + frames + Σ frames inside each object's ±meh window).
pub(super) fn resolve_frames(
    beatmap: &BeatmapRecord,
    frames: &[InputFrame],
    mods: Mods,
    config: &ResolverConfig,
) -> Vec<AnnotatedHitObject> {
    let difficulty = beatmap.difficulty.with_mods(mods);
    let windows = difficulty.hit_windows();
    let scale = difficulty.scale();
    let radius = difficulty.circle_radius() * config.radius_scale;
    let flip = mods.contains(Mods::HARD_ROCK);

    let mut ordered: Vec<IndexedFrame<'_>> = frames.iter().enumerate().collect();
    // Cumulative times may step backwards; stable sort keeps decode order on ties
    ordered.sort_by_key(|(_, frame)| frame.time);

    let mut first_candidate = 0;
    let mut annotations = Vec::with_capacity(beatmap.hit_objects.len());

    for (index, object) in beatmap.hit_objects.iter().enumerate() {
        // Start times are non-decreasing, so the earliest usable frame only moves forward
        let window_start = object.start_time - windows.meh;
        while first_candidate < ordered.len()
            && (ordered[first_candidate].1.time as f64) < window_start
        {
            first_candidate += 1;
        }
        let candidates = &ordered[first_candidate..];

        let annotation = if object.is_sustained() {
            judge_sustained(index, object, candidates)
        } else {
            let mut target = object.stacked_pos(scale);
            if flip {
                target.y = PLAYFIELD_HEIGHT - target.y;
            }
            judge_hit(
                index,
                object,
                target,
                radius,
                &windows,
                candidates,
                config.require_press,
            )
        };
        annotations.push(annotation);
    }

    annotations
}

fn judge_sustained(
    index: usize,
    object: &HitObject,
    candidates: &[IndexedFrame<'_>],
) -> AnnotatedHitObject {
    let inside = candidates
        .iter()
        .take_while(|(_, f)| f.time as f64 <= object.end_time)
        .find(|(_, f)| f.time as f64 >= object.start_time);

    match inside {
        Some(&(frame_index, frame)) => AnnotatedHitObject {
            frame_index: Some(frame_index),
            time_offset: Some(frame.time as f64 - object.start_time),
            ..AnnotatedHitObject::new(index, object, HitResult::Great)
        },
        None => AnnotatedHitObject::new(index, object, HitResult::Miss),
    }
}

fn judge_hit(
    index: usize,
    object: &HitObject,
    target: Pos2,
    radius: f32,
    windows: &HitWindows,
    candidates: &[IndexedFrame<'_>],
    require_press: bool,
) -> AnnotatedHitObject {
    let latest = object.start_time + windows.meh;
    let mut best: Option<(usize, f64)> = None;

    for &(frame_index, frame) in candidates {
        let time = frame.time as f64;
        if time > latest {
            break;
        }
        if require_press && !frame.keys.is_pressing() {
            continue;
        }
        if Pos2::new(frame.x, frame.y).distance(target) > radius {
            continue;
        }

        let delta = time - object.start_time;
        // Strictly smaller keeps the earliest frame on ties
        if best.map_or(true, |(_, d)| delta.abs() < d.abs()) {
            best = Some((frame_index, delta));
        }
    }

    match best {
        Some((frame_index, delta)) => AnnotatedHitObject {
            frame_index: Some(frame_index),
            time_offset: Some(delta),
            ..AnnotatedHitObject::new(index, object, tier_for(delta.abs(), windows))
        },
        None => AnnotatedHitObject::new(index, object, HitResult::Miss),
    }
}

fn tier_for(abs_delta: f64, windows: &HitWindows) -> HitResult {
    if abs_delta <= windows.great {
        HitResult::Great
    } else if abs_delta <= windows.ok {
        HitResult::Ok
    } else if abs_delta <= windows.meh {
        HitResult::Meh
    } else {
        HitResult::Miss
    }
}
