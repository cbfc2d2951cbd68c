//! Command-line parsing and command execution
//!
//! Usage:
//!   osu-parse replay <file.osr>                     Decode a replay
//!   osu-parse replay-extra <file.osr> <file.osu>    Decode and judge a replay
//!   osu-parse beatmap <file.osu>                    Decode a beatmap
//!   osu-parse beatmap-extra <file.osu>              Decode with paths and stacking
//!   osu-parse strains <file.osu>                    Strain peaks and star rating
//!   osu-parse attributes <file.osu>                 Difficulty and performance
//!
//! Options:
//!   --config <file>   Parser configuration (JSON)
//!   --stats <file>    Score statistics (JSON object or array of states)
//!   --mods <mods>     Mods as a bitmask or acronyms (e.g. 72 or HDDT)
//!   --frames          Include decoded replay frames
//!   --pretty          Pretty-print JSON output
//!   -v, -vv, -vvv     Log verbosity

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use osu_parse_core::{Mods, Parser, ParserConfig, ScoreStatsRecord};

/// CLI command to execute
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    Replay { path: PathBuf },
    ReplayExtra { replay: PathBuf, beatmap: PathBuf },
    Beatmap { path: PathBuf },
    BeatmapExtra { path: PathBuf },
    Strains { beatmap: PathBuf },
    Attributes { beatmap: PathBuf },
}

/// CLI options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub stats: Option<PathBuf>,
    pub mods: Mods,
    pub frames: bool,
    pub pretty: bool,
    pub verbosity: u8,
}

/// Score statistics file: a final score or cumulative states
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum StatsFile {
    Single(ScoreStatsRecord),
    States(Vec<ScoreStatsRecord>),
}

/// Parse CLI arguments and return command + options
pub fn parse_args(args: &[String]) -> Result<(CliCommand, CliOptions), String> {
    let mut options = CliOptions::default();
    let mut positional: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "--pretty" => options.pretty = true,
            "--frames" => options.frames = true,
            "--config" | "--stats" | "--mods" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| format!("{} requires a value", arg))?;
                match arg {
                    "--config" => options.config = Some(PathBuf::from(value)),
                    "--stats" => options.stats = Some(PathBuf::from(value)),
                    _ => options.mods = parse_mods(value)?,
                }
            }
            _ if is_verbosity_flag(arg) => {
                options.verbosity = options.verbosity.saturating_add((arg.len() - 1) as u8)
            }
            _ if arg.starts_with('-') => return Err(format!("Unknown option: {}", arg)),
            _ => positional.push(arg),
        }
        i += 1;
    }

    let (name, rest) = positional
        .split_first()
        .ok_or_else(|| "No command specified".to_string())?;

    let path = |index: usize| -> Result<PathBuf, String> {
        rest.get(index)
            .map(PathBuf::from)
            .ok_or_else(|| format!("{} requires a file argument", name))
    };

    let (command, expected) = match *name {
        "replay" => (CliCommand::Replay { path: path(0)? }, 1),
        "replay-extra" => (
            CliCommand::ReplayExtra {
                replay: path(0)?,
                beatmap: path(1).map_err(|_| "replay-extra requires a replay and a beatmap".to_string())?,
            },
            2,
        ),
        "beatmap" => (CliCommand::Beatmap { path: path(0)? }, 1),
        "beatmap-extra" => (CliCommand::BeatmapExtra { path: path(0)? }, 1),
        "strains" => (CliCommand::Strains { beatmap: path(0)? }, 1),
        "attributes" => (CliCommand::Attributes { beatmap: path(0)? }, 1),
        other => return Err(format!("Unknown command: {}", other)),
    };

    if rest.len() > expected {
        return Err(format!("Unexpected argument: {}", rest[expected]));
    }

    Ok((command, options))
}

fn is_verbosity_flag(arg: &str) -> bool {
    arg.len() >= 2 && arg.starts_with('-') && arg[1..].chars().all(|c| c == 'v')
}

/// Parse mods from a bitmask or concatenated two-letter acronyms.
fn parse_mods(s: &str) -> Result<Mods, String> {
    if let Ok(bits) = s.parse::<u32>() {
        return Ok(Mods::from_bits_retain(bits));
    }

    let upper = s.to_ascii_uppercase();
    if upper == "NM" {
        return Ok(Mods::empty());
    }
    if upper.len() % 2 != 0 || !upper.is_ascii() {
        return Err(format!("Invalid mods '{}'. Use a bitmask or acronyms like HDDT", s));
    }

    let mut mods = Mods::empty();
    for chunk in upper.as_bytes().chunks(2) {
        let acronym = std::str::from_utf8(chunk).unwrap_or_default();
        mods |= match acronym {
            "NF" => Mods::NO_FAIL,
            "EZ" => Mods::EASY,
            "TD" => Mods::TOUCH_DEVICE,
            "HD" => Mods::HIDDEN,
            "HR" => Mods::HARD_ROCK,
            "SD" => Mods::SUDDEN_DEATH,
            "DT" => Mods::DOUBLE_TIME,
            "RX" => Mods::RELAX,
            "HT" => Mods::HALF_TIME,
            "NC" => Mods::NIGHTCORE | Mods::DOUBLE_TIME,
            "FL" => Mods::FLASHLIGHT,
            "SO" => Mods::SPUN_OUT,
            "AP" => Mods::AUTOPILOT,
            "PF" => Mods::PERFECT | Mods::SUDDEN_DEATH,
            "FI" => Mods::FADE_IN,
            "MR" => Mods::MIRROR,
            "V2" => Mods::SCORE_V2,
            _ => return Err(format!("Unknown mod acronym: {}", acronym)),
        };
    }
    Ok(mods)
}

/// Run CLI command
pub fn run(command: CliCommand, options: CliOptions) -> anyhow::Result<()> {
    let config = match &options.config {
        Some(path) => ParserConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ParserConfig::default(),
    };
    let parser = Parser::new(config);

    match command {
        CliCommand::Replay { path } => {
            let replay = parser
                .decode_replay(&read_file(&path)?)
                .with_context(|| format!("Failed to decode replay {}", path.display()))?;
            if options.frames {
                replay.frames.frames().context("Failed to decode replay frames")?;
            }
            print_json(&replay, &options)
        }
        CliCommand::ReplayExtra { replay, beatmap } => {
            let extra = parser
                .decode_replay_extra(&read_file(&replay)?, &read_file(&beatmap)?)
                .with_context(|| {
                    format!(
                        "Failed to decode {} against {}",
                        replay.display(),
                        beatmap.display()
                    )
                })?;
            print_json(&extra, &options)
        }
        CliCommand::Beatmap { path } => {
            let beatmap = parser
                .decode_beatmap(&read_file(&path)?)
                .with_context(|| format!("Failed to decode beatmap {}", path.display()))?;
            print_json(&beatmap, &options)
        }
        CliCommand::BeatmapExtra { path } => {
            let beatmap = parser
                .decode_beatmap_extra(&read_file(&path)?)
                .with_context(|| format!("Failed to decode beatmap {}", path.display()))?;
            print_json(&beatmap, &options)
        }
        CliCommand::Strains { beatmap } => {
            let states = match &options.stats {
                Some(path) => Some(match load_stats(path)? {
                    StatsFile::Single(stats) => vec![stats],
                    StatsFile::States(states) => states,
                }),
                None => None,
            };
            let report = parser
                .compute_strains(&read_file(&beatmap)?, states.as_deref(), options.mods)
                .with_context(|| format!("Failed to compute strains for {}", beatmap.display()))?;
            print_json(&report, &options)
        }
        CliCommand::Attributes { beatmap } => {
            let score = match &options.stats {
                Some(path) => match load_stats(path)? {
                    StatsFile::Single(stats) => Some(stats),
                    StatsFile::States(states) => states.last().copied(),
                },
                None => None,
            };
            let attributes = parser
                .compute_attributes(&read_file(&beatmap)?, score, options.mods)
                .with_context(|| {
                    format!("Failed to compute attributes for {}", beatmap.display())
                })?;
            print_json(&attributes, &options)
        }
    }
}

fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_stats(path: &Path) -> anyhow::Result<StatsFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read score stats {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid score stats in {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, options: &CliOptions) -> anyhow::Result<()> {
    let json = if options.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

/// Print CLI help
pub fn print_help() {
    println!("osu-parse v{}", env!("CARGO_PKG_VERSION"));
    println!("Decode osu! replays and beatmaps, compute strain and performance");
    println!();
    println!("USAGE:");
    println!("    osu-parse <command> [options]");
    println!();
    println!("COMMANDS:");
    println!("    replay <osr>                Decode a replay header (frames with --frames)");
    println!("    replay-extra <osr> <osu>    Decode a replay and judge every object");
    println!("    beatmap <osu>               Decode a beatmap");
    println!("    beatmap-extra <osu>         Decode a beatmap with slider paths and stacking");
    println!("    strains <osu>               Strain peaks, star rating and optional performance");
    println!("    attributes <osu>            Difficulty and performance (SS without --stats)");
    println!();
    println!("OPTIONS:");
    println!("    --config <json>             Parser configuration file");
    println!("    --stats <json>              Score statistics: one object or an array of states");
    println!("    --mods <mods>               Bitmask or acronyms, e.g. 72 or HDDT");
    println!("    --frames                    Include decoded replay frames");
    println!("    --pretty                    Pretty-print JSON output");
    println!("    -v, -vv, -vvv               Increase log verbosity");
    println!("    --help                      Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("    osu-parse replay play.osr --frames --pretty");
    println!("    osu-parse strains map.osu --mods HDDT --stats score.json");
}
