//! Property tests over generated charts, replays and score statistics.

mod common;

use common::{circle, BeatmapBuilder, ReplayBuilder};
use osu_parse_core::{
    decode_beatmap, decode_beatmap_extra, decode_replay, resolve, HitResult, ResolveInput,
    ResolverConfig, ScoreStatsRecord,
};
use proptest::prelude::*;

fn arb_result() -> impl Strategy<Value = HitResult> {
    prop_oneof![
        4 => Just(HitResult::Great),
        2 => Just(HitResult::Ok),
        1 => Just(HitResult::Meh),
        2 => Just(HitResult::Miss),
    ]
}

fn stats_for(results: &[HitResult]) -> ScoreStatsRecord {
    let count = |tier: HitResult| results.iter().filter(|r| **r == tier).count() as u32;
    ScoreStatsRecord {
        max_combo: longest_hit_run(results),
        n300: count(HitResult::Great),
        n100: count(HitResult::Ok),
        n50: count(HitResult::Meh),
        n_misses: count(HitResult::Miss),
        ..Default::default()
    }
}

fn longest_hit_run(results: &[HitResult]) -> u32 {
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

proptest! {
    #[test]
    fn decoded_objects_are_sorted_and_difficulty_clamped(
        times in prop::collection::vec(0i32..100_000, 0..60),
        hp in -20.0f64..30.0,
        cs in -20.0f64..30.0,
        od in -20.0f64..30.0,
        ar in -20.0f64..30.0,
    ) {
        let objects = times
            .iter()
            .enumerate()
            .map(|(i, t)| circle((i as i32 * 37) % 512, (i as i32 * 53) % 384, *t))
            .collect();
        let builder = BeatmapBuilder { hp, cs, od, ar: Some(ar), objects, ..Default::default() };
        let beatmap = decode_beatmap(&builder.build()).unwrap();

        prop_assert_eq!(beatmap.hit_objects.len(), times.len());
        prop_assert!(beatmap
            .hit_objects
            .windows(2)
            .all(|w| w[0].start_time <= w[1].start_time));

        let d = &beatmap.difficulty;
        for value in [d.hp_drain, d.circle_size, d.overall_difficulty, d.approach_rate] {
            prop_assert!((0.0..=10.0).contains(&value), "{} out of range", value);
        }
    }

    #[test]
    fn truncated_replays_never_decode(cut_fraction in 0.0f64..1.0) {
        let bytes = ReplayBuilder::default().build();
        let cut = ((bytes.len() - 1) as f64 * cut_fraction) as usize;
        prop_assert!(decode_replay(&bytes[..cut]).is_err());
    }

    #[test]
    fn score_stats_from_a_real_play_always_allocate(
        results in prop::collection::vec(arb_result(), 1..40),
    ) {
        let objects = (0..results.len())
            .map(|i| circle(64 + (i as i32 % 8) * 48, 192, 1000 + i as i32 * 180))
            .collect();
        let beatmap = decode_beatmap_extra(&BeatmapBuilder::with_objects(objects).build()).unwrap();
        let stats = stats_for(&results);

        let annotations = resolve(&beatmap, ResolveInput::ScoreStats(&stats), &ResolverConfig::default())
            .unwrap();
        let allocated: Vec<HitResult> = annotations.iter().map(|a| a.result).collect();

        prop_assert_eq!(stats_for(&allocated), stats);
    }
}
