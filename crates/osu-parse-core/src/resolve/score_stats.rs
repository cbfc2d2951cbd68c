//! Score-stats resolution: distribute judgement counts over the chart
//!
//! Allocation rule, applied deterministically:
//! 1. the combo anchor is the earliest run of consecutive objects whose combo
//!    weights sum exactly to `max_combo` and admits a valid allocation;
//! 2. the objects directly before and after the anchor are misses, and the
//!    remainders on either side get the fewest misses that keep every run at
//!    or below `max_combo` (greedy, misses placed as late as possible);
//! 3. surplus misses are placed from the end of the chart backwards, skipping
//!    the anchor;
//! 4. hit tiers are spread over the remaining objects by error diffusion,
//!    ties going to the better tier.

use crate::beatmap::HitObject;
use crate::error::{Error, Result};

use super::{AnnotatedHitObject, HitResult, ScoreStatsRecord};

const HIT_TIERS: [HitResult; 3] = [HitResult::Great, HitResult::Ok, HitResult::Meh];

/// Annotate `objects` from the final judgement counts of a score.
pub fn allocate_score_stats(
    objects: &[HitObject],
    stats: &ScoreStatsRecord,
) -> Result<Vec<AnnotatedHitObject>> {
    let n = objects.len();
    if stats.judged() != n as u64 {
        return Err(Error::InconsistentScoreStats(format!(
            "{} judgements for {} objects",
            stats.judged(),
            n
        )));
    }

    let weights: Vec<u32> = objects.iter().map(HitObject::combo_weight).collect();
    let misses = place_misses(&weights, stats.max_combo, stats.n_misses as usize)?;

    let hit_counts = [stats.n300, stats.n100, stats.n50];
    let mut tiers = diffuse_tiers(hit_counts, n - stats.n_misses as usize).into_iter();

    let annotations = objects
        .iter()
        .enumerate()
        .map(|(index, object)| {
            let result = if misses[index] {
                HitResult::Miss
            } else {
                tiers.next().unwrap_or(HitResult::Meh)
            };
            AnnotatedHitObject::new(index, object, result)
        })
        .collect();

    Ok(annotations)
}

/// Annotate objects from cumulative score states, one state per processed object.
///
/// Each state must add exactly one judgement to the previous one.
pub fn annotate_score_states(
    objects: &[HitObject],
    states: &[ScoreStatsRecord],
) -> Result<Vec<AnnotatedHitObject>> {
    if states.len() > objects.len() {
        return Err(Error::InconsistentScoreStats(format!(
            "{} score states for {} objects",
            states.len(),
            objects.len()
        )));
    }

    let mut previous = ScoreStatsRecord::default();
    let mut annotations = Vec::with_capacity(states.len());

    for (index, (state, object)) in states.iter().zip(objects).enumerate() {
        let step = |current: u32, before: u32, what: &str| -> Result<u32> {
            current.checked_sub(before).ok_or_else(|| {
                Error::InconsistentScoreStats(format!("{} decreased at state {}", what, index))
            })
        };

        let increments = [
            (HitResult::Great, step(state.n300, previous.n300, "n300")?),
            (HitResult::Ok, step(state.n100, previous.n100, "n100")?),
            (HitResult::Meh, step(state.n50, previous.n50, "n50")?),
            (HitResult::Miss, step(state.n_misses, previous.n_misses, "n_misses")?),
        ];
        step(state.max_combo, previous.max_combo, "max_combo")?;

        let mut changed = increments.iter().filter(|(_, delta)| *delta > 0);
        let result = match (changed.next(), changed.next()) {
            (Some((result, 1)), None) => *result,
            _ => {
                return Err(Error::InconsistentScoreStats(format!(
                    "state {} must add exactly one judgement",
                    index
                )))
            }
        };

        annotations.push(AnnotatedHitObject::new(index, object, result));
        previous = *state;
    }

    Ok(annotations)
}

/// Choose which objects are misses. `true` marks a miss.
fn place_misses(weights: &[u32], max_combo: u32, misses: usize) -> Result<Vec<bool>> {
    let n = weights.len();
    let total: u64 = weights.iter().map(|&w| u64::from(w)).sum();

    if max_combo == 0 {
        if misses != n {
            return Err(Error::InconsistentScoreStats(format!(
                "max combo 0 requires every object to be missed, got {} of {}",
                misses, n
            )));
        }
        return Ok(vec![true; n]);
    }

    if misses == 0 {
        if total != u64::from(max_combo) {
            return Err(Error::InconsistentScoreStats(format!(
                "full combo of {} does not match max combo {}",
                total, max_combo
            )));
        }
        return Ok(vec![false; n]);
    }

    for (start, end) in anchor_runs(weights, max_combo) {
        let mut placed = minimal_misses(weights, max_combo, start, end);

        let needed = placed.iter().filter(|&&m| m).count();
        let capacity = n - (end - start);
        if needed > misses || misses > capacity {
            continue;
        }

        let mut surplus = misses - needed;
        for i in (0..n).rev() {
            if surplus == 0 {
                break;
            }
            if (start..end).contains(&i) || placed[i] {
                continue;
            }
            placed[i] = true;
            surplus -= 1;
        }

        return Ok(placed);
    }

    Err(Error::InconsistentScoreStats(format!(
        "no placement of {} misses yields max combo {}",
        misses, max_combo
    )))
}

/// Runs `[start, end)` whose weights sum to `target`, in order of start.
fn anchor_runs(weights: &[u32], target: u32) -> Vec<(usize, usize)> {
    let target = u64::from(target);
    let mut runs = Vec::new();
    let mut end = 0;
    let mut sum: u64 = 0;

    for start in 0..weights.len() {
        if end < start {
            end = start;
            sum = 0;
        }
        while end < weights.len() && sum < target {
            sum += u64::from(weights[end]);
            end += 1;
        }
        if sum == target {
            runs.push((start, end));
        }
        if end > start {
            sum -= u64::from(weights[start]);
        }
    }

    runs
}

/// Fewest misses around the anchor `[start, end)` keeping all runs within `max_combo`.
fn minimal_misses(weights: &[u32], max_combo: u32, start: usize, end: usize) -> Vec<bool> {
    let mut placed = vec![false; weights.len()];

    if start > 0 {
        placed[start - 1] = true;
        fill_greedy(weights, max_combo, 0..start - 1, &mut placed);
    }
    if end < weights.len() {
        placed[end] = true;
        fill_greedy(weights, max_combo, end + 1..weights.len(), &mut placed);
    }

    placed
}

fn fill_greedy(weights: &[u32], max_combo: u32, range: std::ops::Range<usize>, placed: &mut [bool]) {
    let mut run: u64 = 0;
    for i in range {
        let weight = u64::from(weights[i]);
        if run + weight > u64::from(max_combo) {
            placed[i] = true;
            run = 0;
        } else {
            run += weight;
        }
    }
}

/// Spread `counts` (great, ok, meh) over `hits` slots in chart order.
fn diffuse_tiers(counts: [u32; 3], hits: usize) -> Vec<HitResult> {
    let total = hits as i64;
    let mut remaining = counts;
    let mut error = [0i64; 3];
    let mut tiers = Vec::with_capacity(hits);

    for _ in 0..hits {
        for (acc, &count) in error.iter_mut().zip(&counts) {
            *acc += i64::from(count);
        }

        // Iterating from best to worst and replacing only on a strictly larger
        // error keeps ties on the better tier
        let mut chosen: Option<usize> = None;
        for tier in 0..HIT_TIERS.len() {
            if remaining[tier] == 0 {
                continue;
            }
            if chosen.map_or(true, |c| error[tier] > error[c]) {
                chosen = Some(tier);
            }
        }

        let Some(tier) = chosen else {
            break;
        };
        remaining[tier] -= 1;
        error[tier] -= total;
        tiers.push(HIT_TIERS[tier]);
    }

    tiers
}
