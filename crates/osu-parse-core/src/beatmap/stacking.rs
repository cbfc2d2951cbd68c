//! Stack height resolution for overlapping objects

use super::objects::HitObject;

/// Objects closer than this (in osu!pixels) count as coincident.
const STACK_DISTANCE: f32 = 3.0;

/// Assign stack heights in place, walking backwards from the last object.
///
/// `objects` must be sorted by start time and have slider paths resolved so
/// that slider end positions are accurate.
pub(crate) fn apply_stacking(objects: &mut [HitObject], preempt: f64, stack_leniency: f32) {
    let stack_threshold = preempt * f64::from(stack_leniency);

    for obj in objects.iter_mut() {
        obj.stack_height = 0;
    }

    for i in (1..objects.len()).rev() {
        if objects[i].stack_height != 0 || objects[i].is_spinner() {
            continue;
        }

        if objects[i].is_circle() {
            stack_onto_circle(objects, i, stack_threshold);
        } else if objects[i].is_slider() {
            stack_onto_slider(objects, i, stack_threshold);
        }
    }
}

fn stack_onto_circle(objects: &mut [HitObject], i: usize, stack_threshold: f64) {
    let mut current = i;
    let mut n = i;

    while n > 0 {
        n -= 1;
        if objects[n].is_spinner() {
            continue;
        }

        if objects[current].start_time - objects[n].end_time > stack_threshold {
            break;
        }

        // A slider ending under the circle pushes the circles after it down
        if objects[n].is_slider() && objects[n].end_pos().distance(objects[current].pos) < STACK_DISTANCE {
            let offset = objects[current].stack_height - objects[n].stack_height + 1;
            let slider_end = objects[n].end_pos();
            for obj in &mut objects[n + 1..=i] {
                if slider_end.distance(obj.pos) < STACK_DISTANCE {
                    obj.stack_height -= offset;
                }
            }
            break;
        }

        if objects[n].pos.distance(objects[current].pos) < STACK_DISTANCE {
            objects[n].stack_height = objects[current].stack_height + 1;
            current = n;
        }
    }
}

fn stack_onto_slider(objects: &mut [HitObject], i: usize, stack_threshold: f64) {
    let mut current = i;
    let mut n = i;

    while n > 0 {
        n -= 1;
        if objects[n].is_spinner() {
            continue;
        }

        if objects[current].start_time - objects[n].start_time > stack_threshold {
            break;
        }

        if objects[n].end_pos().distance(objects[current].pos) < STACK_DISTANCE {
            objects[n].stack_height = objects[current].stack_height + 1;
            current = n;
        }
    }
}
