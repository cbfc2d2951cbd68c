//! # osu-parse-core
//!
//! Decoder for osu! replays and beatmaps with a strain/difficulty engine.
//!
//! This crate provides the foundational functionality for:
//! - Decoding `.osr` replays, with input frames decompressed on first access
//! - Decoding `.osu` beatmaps, optionally with slider paths and stacking
//! - Judging every hit object from replay frames or from score statistics
//! - Strain peaks, star rating and performance points
//!
//! ## Modules
//!
//! - [`api`] - Entry points and the configurable [`Parser`]
//! - [`beatmap`] - Beatmap data structures and the `.osu` decoder
//! - [`config`] - Parser configuration
//! - [`cursor`] - Bounds-checked reader over a byte buffer
//! - [`diagnostics`] - Panic reporting
//! - [`error`] - Error types and Result alias
//! - [`mods`] - Gameplay mod bitset
//! - [`replay`] - Replay data structures and the `.osr` decoder
//! - [`resolve`] - Hit object judgement from frames or score statistics
//! - [`strain`] - Strain, star rating and performance calculation
//!
//! ## Example
//!
//! ```no_run
//! use osu_parse_core::{compute_strains, decode_replay_extra, init_diagnostics, Mods};
//!
//! init_diagnostics();
//!
//! let replay = std::fs::read("play.osr").expect("Failed to read replay");
//! let beatmap = std::fs::read("map.osu").expect("Failed to read beatmap");
//!
//! let extra = decode_replay_extra(&replay, &beatmap).expect("Failed to decode");
//! println!("{} objects judged", extra.annotations.len());
//!
//! let report = compute_strains(&beatmap, None, Mods::HIDDEN).expect("Failed to compute");
//! println!("{:.2} stars", report.difficulty.stars);
//! ```

// Module declarations
pub mod api;
pub mod beatmap;
pub mod config;
pub mod cursor;
pub mod diagnostics;
pub mod error;
pub mod mods;
pub mod replay;
pub mod resolve;
pub mod strain;

// Re-export key types for convenience

// Error types
pub use error::{Error, FormatKind, Result};

// Entry points
pub use api::{
    compute_attributes, compute_strains, decode_beatmap, decode_beatmap_extra, decode_replay,
    decode_replay_extra, Parser, ReplayExtra,
};
pub use diagnostics::init_diagnostics;

// Configuration
pub use config::ParserConfig;

// Beatmap types
pub use beatmap::{
    BeatmapDifficulty, BeatmapRecord, GameMode, HitObject, HitObjectKind, Pos2, Slider, SliderPath,
};

// Replay types
pub use replay::{FrameData, FrameStream, Grade, InputFrame, Judgements, Keys, ReplayRecord};

// Resolution
pub use resolve::{
    resolve, AnnotatedHitObject, HitResult, ResolveInput, ResolverConfig, ScoreStatsRecord,
};

// Strain engine
pub use strain::{
    BeatmapAttributes, DifficultyAttributes, PerformanceAttributes, SkillKind, SkillStrains,
    StrainConfig, StrainPeak, StrainReport, StrainSequence,
};

pub use mods::Mods;
