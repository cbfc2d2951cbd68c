//! Judging hit objects from frames and from score statistics.

mod common;

use common::{circle, BeatmapBuilder, Frame, ReplayBuilder};
use osu_parse_core::{
    decode_beatmap_extra, decode_replay_extra, resolve, BeatmapRecord, Error, HitResult, InputFrame, Keys, Mods,
    ResolveInput, ResolverConfig, ScoreStatsRecord,
};

fn three_circles() -> BeatmapRecord {
    let bytes =
        BeatmapBuilder::with_objects(vec![circle(100, 100, 100), circle(200, 100, 200), circle(300, 100, 300)])
            .build();
    decode_beatmap_extra(&bytes).expect("Failed to decode beatmap")
}

fn four_circles() -> BeatmapRecord {
    let bytes = BeatmapBuilder::with_objects((0..4).map(|i| circle(100 + i * 50, 100, 500 + i * 300)).collect())
        .build();
    decode_beatmap_extra(&bytes).expect("Failed to decode beatmap")
}

/// One frame per millisecond from 95 to 305, resting on the nearest object.
fn dense_frames(skip: impl Fn(i64) -> bool) -> Vec<InputFrame> {
    let mut previous = 0;
    (95..=305)
        .filter(|t| !skip(*t))
        .map(|time| {
            let x = match time {
                ..=149 => 100.0,
                150..=249 => 200.0,
                _ => 300.0,
            };
            let frame = InputFrame {
                time,
                delta: time - previous,
                x,
                y: 100.0,
                keys: Keys::K1,
            };
            previous = time;
            frame
        })
        .collect()
}

fn frame_results(beatmap: &BeatmapRecord, frames: &[InputFrame]) -> Vec<HitResult> {
    resolve(
        beatmap,
        ResolveInput::Frames {
            frames,
            mods: Mods::empty(),
        },
        &ResolverConfig::default(),
    )
    .expect("Frame resolution failed")
    .iter()
    .map(|a| a.result)
    .collect()
}

#[test]
fn test_dense_frames_hit_every_object() {
    let beatmap = three_circles();
    let results = frame_results(&beatmap, &dense_frames(|_| false));
    assert_eq!(results, vec![HitResult::Great; 3]);
}

#[test]
fn test_missing_frames_miss_only_that_object() {
    let beatmap = three_circles();
    let frames = dense_frames(|t| (150..250).contains(&t));
    let results = frame_results(&beatmap, &frames);
    assert_eq!(results, vec![HitResult::Great, HitResult::Miss, HitResult::Great]);
}

#[test]
fn test_frames_matched_exactly_on_time() {
    let beatmap = three_circles();
    let frames = dense_frames(|_| false);
    let annotations = resolve(
        &beatmap,
        ResolveInput::Frames {
            frames: &frames,
            mods: Mods::empty(),
        },
        &ResolverConfig::default(),
    )
    .unwrap();

    for (annotation, expected_time) in annotations.iter().zip([100, 200, 300]) {
        let frame = annotation.frame_index.expect("hit should record its frame");
        assert_eq!(frames[frame].time, expected_time);
        assert_eq!(annotation.time_offset, Some(0.0));
    }
}

#[test]
fn test_require_press_ignores_idle_cursor() {
    let beatmap = three_circles();
    let frames: Vec<InputFrame> = dense_frames(|_| false)
        .into_iter()
        .map(|f| InputFrame { keys: Keys::empty(), ..f })
        .collect();
    let config = ResolverConfig {
        require_press: true,
        ..Default::default()
    };

    let annotations = resolve(
        &beatmap,
        ResolveInput::Frames {
            frames: &frames,
            mods: Mods::empty(),
        },
        &config,
    )
    .unwrap();
    assert!(annotations.iter().all(|a| a.result == HitResult::Miss));
}

#[test]
fn test_score_stats_miss_breaks_combo_at_max() {
    let beatmap = four_circles();
    let stats = ScoreStatsRecord {
        max_combo: 3,
        n300: 3,
        n_misses: 1,
        ..Default::default()
    };
    let annotations = resolve(&beatmap, ResolveInput::ScoreStats(&stats), &ResolverConfig::default())
        .expect("Allocation should exist");

    let results: Vec<HitResult> = annotations.iter().map(|a| a.result).collect();
    assert_ne!(results[0], HitResult::Miss);
    assert_eq!(results.iter().filter(|r| **r == HitResult::Miss).count(), 1);
    assert_eq!(longest_hit_run(&results), 3);
}

#[test]
fn test_score_stats_tier_totals_match() {
    let bytes = BeatmapBuilder::with_objects(common::stream(20, 200)).build();
    let beatmap = decode_beatmap_extra(&bytes).unwrap();
    let stats = ScoreStatsRecord {
        max_combo: 9,
        n300: 12,
        n100: 4,
        n50: 2,
        n_misses: 2,
        ..Default::default()
    };
    let annotations = resolve(&beatmap, ResolveInput::ScoreStats(&stats), &ResolverConfig::default())
        .unwrap();
    let results: Vec<HitResult> = annotations.iter().map(|a| a.result).collect();

    let count = |tier: HitResult| results.iter().filter(|r| **r == tier).count() as u32;
    assert_eq!(count(HitResult::Great), 12);
    assert_eq!(count(HitResult::Ok), 4);
    assert_eq!(count(HitResult::Meh), 2);
    assert_eq!(count(HitResult::Miss), 2);
    assert_eq!(longest_hit_run(&results), 9);
}

#[test]
fn test_unreachable_combo_is_inconsistent() {
    let beatmap = four_circles();
    let cases = [
        // A full combo with a miss in it
        ScoreStatsRecord { max_combo: 4, n300: 3, n_misses: 1, ..Default::default() },
        // Combo one needs two misses on four circles
        ScoreStatsRecord { max_combo: 1, n300: 3, n_misses: 1, ..Default::default() },
        // Judgement total does not match the chart
        ScoreStatsRecord { max_combo: 3, n300: 3, ..Default::default() },
        // Combo longer than the chart
        ScoreStatsRecord { max_combo: 9, n300: 4, ..Default::default() },
    ];

    for stats in cases {
        let err = resolve(&beatmap, ResolveInput::ScoreStats(&stats), &ResolverConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::InconsistentScoreStats(_)), "{:?} gave {:?}", stats, err);
    }
}

#[test]
fn test_score_states_difference_into_results() {
    let beatmap = four_circles();
    let state = |combo, n300, n100, misses| ScoreStatsRecord {
        max_combo: combo,
        n300,
        n100,
        n_misses: misses,
        ..Default::default()
    };
    let states = [state(1, 1, 0, 0), state(2, 1, 1, 0), state(2, 1, 1, 1), state(2, 2, 1, 1)];

    let annotations = resolve(&beatmap, ResolveInput::ScoreStates(&states), &ResolverConfig::default())
        .unwrap();
    let results: Vec<HitResult> = annotations.iter().map(|a| a.result).collect();
    assert_eq!(
        results,
        vec![HitResult::Great, HitResult::Ok, HitResult::Miss, HitResult::Great]
    );

    let skipping = [state(1, 1, 0, 0), state(3, 3, 0, 0)];
    let err = resolve(&beatmap, ResolveInput::ScoreStates(&skipping), &ResolverConfig::default())
        .unwrap_err();
    assert!(matches!(err, Error::InconsistentScoreStats(_)));
}

fn longest_hit_run(results: &[HitResult]) -> usize {
    let mut longest = 0;
    let mut run = 0;
    for result in results {
        if result.is_hit() {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    longest
}

#[test]
fn test_replay_frames_stepping_back_in_time() {
    let beatmap = BeatmapBuilder::with_objects(vec![circle(100, 100, 1000), circle(300, 100, 2000)]).build();
    let replay = ReplayBuilder {
        frames: vec![
            Frame {
                time: 2000,
                x: 300.0,
                y: 100.0,
                keys: 1,
            },
            Frame {
                time: 1000,
                x: 100.0,
                y: 100.0,
                keys: 1,
            },
        ],
        ..Default::default()
    }
    .build();

    let extra = decode_replay_extra(&replay, &beatmap).unwrap();
    let results: Vec<HitResult> = extra.annotations.iter().map(|a| a.result).collect();
    assert_eq!(results, vec![HitResult::Great, HitResult::Great]);
    // Indices refer to the decoded frame list
    assert_eq!(extra.annotations[0].frame_index, Some(1));
    assert_eq!(extra.annotations[1].frame_index, Some(0));
}
