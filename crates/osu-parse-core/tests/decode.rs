//! Decoding synthetic replays and beatmaps end to end.

mod common;

use common::{circle, BeatmapBuilder, Frame, ReplayBuilder};
use md5::{Digest, Md5};
use osu_parse_core::{
    decode_beatmap, decode_beatmap_extra, decode_replay, decode_replay_extra, Error, GameMode,
    HitResult, Keys, Mods,
};

#[test]
fn test_replay_fields_round_trip() {
    let builder = ReplayBuilder {
        mode: 1,
        player_name: "someone".to_string(),
        counts: [120, 30, 4, 10, 7, 2],
        score: 987_654,
        max_combo: 144,
        perfect: false,
        mods: (Mods::HIDDEN | Mods::DOUBLE_TIME).bits(),
        frames: vec![
            Frame { time: 10, x: 1.5, y: 2.5, keys: 1 },
            Frame { time: 26, x: 3.0, y: 4.0, keys: 0 },
        ],
        ..Default::default()
    };
    let replay = decode_replay(&builder.build()).expect("Failed to decode replay");

    assert_eq!(replay.mode, GameMode::Taiko);
    assert_eq!(replay.version, builder.version);
    assert_eq!(replay.beatmap_hash, builder.beatmap_hash);
    assert_eq!(replay.player_name, "someone");
    assert_eq!(replay.replay_hash.as_deref(), Some(builder.replay_hash.as_str()));
    assert_eq!(replay.judgements.count_300, 120);
    assert_eq!(replay.judgements.count_100, 30);
    assert_eq!(replay.judgements.count_50, 4);
    assert_eq!(replay.judgements.count_geki, 10);
    assert_eq!(replay.judgements.count_katu, 7);
    assert_eq!(replay.judgements.count_miss, 2);
    assert_eq!(replay.score, 987_654);
    assert_eq!(replay.max_combo, 144);
    assert!(!replay.perfect);
    assert_eq!(replay.mods, Mods::HIDDEN | Mods::DOUBLE_TIME);
    assert_eq!(replay.life_graph.len(), 2);
    assert_eq!(replay.timestamp, builder.timestamp);
    assert_eq!(replay.online_score_id, Some(4_000_000_000));

    let data = replay.frames.frames().expect("Failed to decode frames");
    assert_eq!(data.rng_seed, Some(1337));
    assert_eq!(data.frames.len(), 2);
    assert_eq!(data.frames[0].time, 10);
    assert_eq!(data.frames[1].time, 26);
    assert_eq!(data.frames[1].delta, 16);
    assert_eq!(data.frames[0].x, 1.5);
    assert_eq!(data.frames[0].keys, Keys::M1);
}

#[test]
fn test_replay_decode_is_idempotent() {
    let bytes = ReplayBuilder::default().build();
    let first = decode_replay(&bytes).unwrap();
    let second = decode_replay(&bytes).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_truncated_replay_header_is_eof() {
    let bytes = ReplayBuilder::default().build();
    // Past the three strings, inside the judgement counts
    let header_strings = 1 + 4 + 34 + 8 + 34;
    for cut in [0, 3, header_strings + 1, header_strings + 9] {
        let err = decode_replay(&bytes[..cut]).unwrap_err();
        assert!(
            matches!(err, Error::UnexpectedEof { .. }),
            "cut at {} gave {:?}",
            cut,
            err
        );
    }
}

#[test]
fn test_beatmap_fields_round_trip() {
    let builder = BeatmapBuilder {
        hp: 6.0,
        cs: 3.5,
        od: 8.0,
        ar: Some(9.3),
        objects: vec![circle(64, 64, 500), circle(128, 96, 750)],
        ..Default::default()
    };
    let beatmap = decode_beatmap(&builder.build()).expect("Failed to decode beatmap");

    assert_eq!(beatmap.format_version, 14);
    assert_eq!(beatmap.mode, GameMode::Osu);
    assert_eq!(beatmap.metadata.title, "Fixture Song");
    assert_eq!(beatmap.metadata.artist, "Fixture Artist");
    assert_eq!(beatmap.metadata.creator, "mapper");
    assert_eq!(beatmap.metadata.version, "Insane");
    assert_eq!(beatmap.metadata.tags, vec!["fixture", "test"]);
    assert_eq!(beatmap.metadata.beatmap_id, Some(123));
    assert_eq!(beatmap.general.audio_file, "audio.mp3");
    assert_eq!(beatmap.difficulty.hp_drain, 6.0);
    assert_eq!(beatmap.difficulty.circle_size, 3.5);
    assert_eq!(beatmap.difficulty.overall_difficulty, 8.0);
    assert!((beatmap.difficulty.approach_rate - 9.3).abs() < 1e-6);
    assert_eq!(beatmap.hit_objects.len(), 2);
    assert_eq!(beatmap.hit_objects[1].start_time, 750.0);
    assert_eq!(beatmap.hit_objects[1].pos.x, 128.0);
    assert_eq!(beatmap.n_circles, 2);
    assert_eq!(beatmap.max_combo, 2);
    assert!(!beatmap.extra_resolved);
}

#[test]
fn test_beatmap_hash_is_md5_of_file() {
    let bytes = BeatmapBuilder::with_objects(vec![circle(0, 0, 0)]).build();
    let beatmap = decode_beatmap(&bytes).unwrap();
    assert_eq!(beatmap.hash, format!("{:x}", Md5::digest(&bytes)));
}

#[test]
fn test_beatmap_decode_is_idempotent() {
    let bytes = BeatmapBuilder::with_objects(common::stream(12, 150)).build();
    assert_eq!(decode_beatmap(&bytes).unwrap(), decode_beatmap(&bytes).unwrap());
    assert_eq!(
        decode_beatmap_extra(&bytes).unwrap(),
        decode_beatmap_extra(&bytes).unwrap()
    );
}

#[test]
fn test_replay_extra_judges_frames() {
    let beatmap = BeatmapBuilder::with_objects(vec![
        circle(100, 100, 1000),
        circle(200, 100, 1500),
    ])
    .build();
    let beatmap_hash = format!("{:x}", Md5::digest(&beatmap));

    let replay = ReplayBuilder {
        beatmap_hash,
        frames: vec![
            Frame { time: 990, x: 100.0, y: 100.0, keys: 1 },
            Frame { time: 1200, x: 150.0, y: 100.0, keys: 0 },
            Frame { time: 1505, x: 200.0, y: 100.0, keys: 2 },
        ],
        ..Default::default()
    }
    .build();

    let extra = decode_replay_extra(&replay, &beatmap).expect("Failed to decode");
    assert_eq!(extra.annotations.len(), 2);
    assert_eq!(extra.annotations[0].result, HitResult::Great);
    assert_eq!(extra.annotations[0].frame_index, Some(0));
    assert_eq!(extra.annotations[0].time_offset, Some(-10.0));
    assert_eq!(extra.annotations[1].result, HitResult::Great);
    assert_eq!(extra.annotations[1].frame_index, Some(2));
    assert!(extra.replay.frames.is_decoded());
}

#[test]
fn test_replay_extra_tolerates_hash_mismatch() {
    let beatmap = BeatmapBuilder::with_objects(vec![circle(100, 100, 1000)]).build();
    let replay = ReplayBuilder::default().build();

    let extra = decode_replay_extra(&replay, &beatmap).expect("Mismatch should only warn");
    assert_eq!(extra.annotations.len(), 1);
    assert_eq!(extra.annotations[0].result, HitResult::Miss);
}
