//! `.osu` beatmap decoding
//!
//! The file is sectioned text: a leading `osu file format v<N>` marker, then
//! `[Section]` headers followed by either `Key: Value` pairs or
//! comma-separated records.

use std::str::FromStr;

use md5::{Digest, Md5};

use crate::cursor::ByteCursor;
use crate::error::{Error, FormatKind, Result};

use super::curve::SliderPath;
use super::metadata::{BeatmapGeneral, BeatmapMetadata};
use super::objects::{CurveType, HitObject, HitObjectKind, Pos2, Slider};
use super::stacking::apply_stacking;
use super::timing::{beat_len_at, slider_velocity_at, TimingPoint};
use super::{total_combo, BeatmapDifficulty, BeatmapRecord, BreakPeriod, Color, GameMode};

/// Oldest format marker this decoder understands
pub const MIN_FORMAT_VERSION: u32 = 3;
/// Newest format marker written by osu!stable
pub const MAX_FORMAT_VERSION: u32 = 14;
/// Marker written by osu!lazer exports
pub const LAZER_FORMAT_VERSION: u32 = 128;

const FORMAT_PREFIX: &str = "osu file format v";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const TYPE_CIRCLE: u8 = 1;
const TYPE_SLIDER: u8 = 1 << 1;
const TYPE_NEW_COMBO: u8 = 1 << 2;
const TYPE_SPINNER: u8 = 1 << 3;
const TYPE_HOLD: u8 = 1 << 7;
const COMBO_OFFSET_MASK: u8 = 0b0111_0000;

/// Upper bound on ticks per span, guards against degenerate tick rates
const MAX_TICKS_PER_SPAN: u32 = 1024;
/// Most slides a slider may declare; lazer rejects more than 9000 repeats
const MAX_SLIDES: u32 = 9001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    General,
    Metadata,
    Difficulty,
    Events,
    TimingPoints,
    Colours,
    HitObjects,
    Other,
}

impl Section {
    fn from_header(name: &str) -> Self {
        match name {
            "General" => Self::General,
            "Metadata" => Self::Metadata,
            "Difficulty" => Self::Difficulty,
            "Events" => Self::Events,
            "TimingPoints" => Self::TimingPoints,
            "Colours" => Self::Colours,
            "HitObjects" => Self::HitObjects,
            _ => Self::Other,
        }
    }
}

/// Accumulates sections while lines are read
#[derive(Default)]
struct DecodeState {
    general: BeatmapGeneral,
    metadata: BeatmapMetadata,
    difficulty: BeatmapDifficulty,
    approach_rate_set: bool,
    background_file: Option<String>,
    timing_points: Vec<TimingPoint>,
    breaks: Vec<BreakPeriod>,
    combo_colors: Vec<Color>,
    hit_objects: Vec<HitObject>,
}

/// Decode a `.osu` file into a [`BeatmapRecord`].
///
/// Slider paths and stack heights are left unresolved; see
/// [`decode_beatmap_extra`].
pub fn decode_beatmap(bytes: &[u8]) -> Result<BeatmapRecord> {
    decode(bytes, false)
}

/// Decode a `.osu` file and resolve slider paths and stacking.
pub fn decode_beatmap_extra(bytes: &[u8]) -> Result<BeatmapRecord> {
    decode(bytes, true)
}

fn decode(bytes: &[u8], extra: bool) -> Result<BeatmapRecord> {
    let hash = format!("{:x}", Md5::digest(bytes));

    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let bom_len = bytes.len() - body.len();
    let mut cursor = ByteCursor::new(body);

    let format_version = read_format_version(&mut cursor, bom_len)?;
    let mut state = DecodeState::default();
    let mut section = Section::None;

    loop {
        let offset = bom_len + cursor.position();
        let Some(raw) = cursor.read_line() else {
            break;
        };
        let line = std::str::from_utf8(raw)
            .map_err(|e| Error::malformed(offset, format!("invalid UTF-8: {}", e)))?;
        let line = line.trim();

        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = Section::from_header(name.trim());
            continue;
        }

        match section {
            Section::General => state.parse_general(line, offset)?,
            Section::Metadata => state.parse_metadata(line, offset)?,
            Section::Difficulty => state.parse_difficulty(line, offset)?,
            Section::Events => state.parse_event(line, offset)?,
            Section::TimingPoints => state.parse_timing_point(line, offset)?,
            Section::Colours => state.parse_colour(line, offset)?,
            Section::HitObjects => state.parse_hit_object(line, offset)?,
            Section::None | Section::Other => {}
        }
    }

    let mut record = state.finish(format_version, hash)?;
    if extra {
        resolve_extra(&mut record);
    }

    tracing::debug!(
        version = record.format_version,
        objects = record.hit_objects.len(),
        timing_points = record.timing_points.len(),
        extra,
        "Decoded beatmap"
    );

    Ok(record)
}

fn read_format_version(cursor: &mut ByteCursor<'_>, base_offset: usize) -> Result<u32> {
    loop {
        let offset = base_offset + cursor.position();
        let raw = cursor
            .read_line()
            .ok_or_else(|| Error::malformed(offset, "missing file format marker"))?;
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let version = line
            .strip_prefix(FORMAT_PREFIX)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .ok_or_else(|| Error::malformed(offset, format!("invalid file format marker: {:?}", line)))?;

        let supported = (MIN_FORMAT_VERSION..=MAX_FORMAT_VERSION).contains(&version)
            || version == LAZER_FORMAT_VERSION;
        if !supported {
            return Err(Error::UnsupportedFormatVersion {
                format: FormatKind::Beatmap,
                version: i64::from(version),
            });
        }

        return Ok(version);
    }
}

fn split_key_value(line: &str) -> Option<(&str, &str)> {
    line.split_once(':').map(|(k, v)| (k.trim(), v.trim()))
}

fn parse_num<T: FromStr>(value: &str, offset: usize, what: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| Error::malformed(offset, format!("invalid {}: {:?}", what, value)))
}

fn parse_finite(value: &str, offset: usize, what: &str) -> Result<f64> {
    let parsed: f64 = parse_num(value, offset, what)?;
    if !parsed.is_finite() {
        return Err(Error::malformed(offset, format!("non-finite {}: {:?}", what, value)));
    }
    Ok(parsed)
}

/// Parse a time in milliseconds; stable stores these as 32-bit integers.
fn parse_time(value: &str, offset: usize, what: &str) -> Result<f64> {
    let parsed = parse_finite(value, offset, what)?;
    if parsed < f64::from(i32::MIN) || parsed > f64::from(i32::MAX) {
        return Err(Error::malformed(offset, format!("{} out of range: {:?}", what, value)));
    }
    Ok(parsed)
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Clamp a difficulty value into range, logging when the source was out of range.
fn clamp_logged(value: f64, min: f64, max: f64, key: &str) -> f64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        tracing::warn!(key, value, clamped, "Difficulty value out of range, clamped");
    }
    clamped
}

impl DecodeState {
    fn parse_general(&mut self, line: &str, offset: usize) -> Result<()> {
        let Some((key, value)) = split_key_value(line) else {
            return Ok(());
        };

        match key {
            "AudioFilename" => self.general.audio_file = value.to_string(),
            "AudioLeadIn" => self.general.audio_lead_in = parse_num(value, offset, key)?,
            "PreviewTime" => self.general.preview_time = parse_num(value, offset, key)?,
            "StackLeniency" => {
                self.general.stack_leniency = parse_finite(value, offset, key)? as f32
            }
            "Mode" => {
                let id: u8 = parse_num(value, offset, key)?;
                self.general.mode = GameMode::from_id(id)
                    .ok_or_else(|| Error::malformed(offset, format!("invalid mode: {}", id)))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn parse_metadata(&mut self, line: &str, offset: usize) -> Result<()> {
        let Some((key, value)) = split_key_value(line) else {
            return Ok(());
        };

        let meta = &mut self.metadata;
        match key {
            "Title" => meta.title = value.to_string(),
            "TitleUnicode" => meta.title_unicode = non_empty(value),
            "Artist" => meta.artist = value.to_string(),
            "ArtistUnicode" => meta.artist_unicode = non_empty(value),
            "Creator" => meta.creator = value.to_string(),
            "Version" => meta.version = value.to_string(),
            "Source" => meta.source = non_empty(value),
            "Tags" => meta.tags = value.split_whitespace().map(String::from).collect(),
            "BeatmapID" => {
                let id: i32 = parse_num(value, offset, key)?;
                meta.beatmap_id = (id > 0).then_some(id);
            }
            "BeatmapSetID" => {
                let id: i32 = parse_num(value, offset, key)?;
                meta.beatmap_set_id = (id > 0).then_some(id);
            }
            _ => {}
        }
        Ok(())
    }

    fn parse_difficulty(&mut self, line: &str, offset: usize) -> Result<()> {
        let Some((key, value)) = split_key_value(line) else {
            return Ok(());
        };

        let diff = &mut self.difficulty;
        match key {
            "HPDrainRate" => {
                diff.hp_drain = clamp_logged(parse_finite(value, offset, key)?, 0.0, 10.0, key) as f32
            }
            "CircleSize" => {
                diff.circle_size =
                    clamp_logged(parse_finite(value, offset, key)?, 0.0, 10.0, key) as f32
            }
            "OverallDifficulty" => {
                diff.overall_difficulty =
                    clamp_logged(parse_finite(value, offset, key)?, 0.0, 10.0, key) as f32
            }
            "ApproachRate" => {
                diff.approach_rate =
                    clamp_logged(parse_finite(value, offset, key)?, 0.0, 10.0, key) as f32;
                self.approach_rate_set = true;
            }
            "SliderMultiplier" => {
                diff.slider_multiplier = clamp_logged(parse_finite(value, offset, key)?, 0.4, 3.6, key)
            }
            "SliderTickRate" => {
                diff.slider_tick_rate = clamp_logged(parse_finite(value, offset, key)?, 0.5, 8.0, key)
            }
            _ => {}
        }
        Ok(())
    }

    fn parse_event(&mut self, line: &str, offset: usize) -> Result<()> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();

        match fields.first().copied() {
            Some("0") if fields.len() >= 3 => {
                if self.background_file.is_none() {
                    self.background_file = non_empty(fields[2].trim_matches('"'));
                }
            }
            Some("2") | Some("Break") => {
                if fields.len() < 3 {
                    return Err(Error::malformed(offset, "break event needs start and end"));
                }
                let start_time = parse_time(fields[1], offset, "break start")?;
                let end_time = parse_time(fields[2], offset, "break end")?;
                self.breaks.push(BreakPeriod {
                    start_time,
                    end_time: end_time.max(start_time),
                });
            }
            _ => {}
        }
        Ok(())
    }

    fn parse_timing_point(&mut self, line: &str, offset: usize) -> Result<()> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 2 {
            return Err(Error::malformed(offset, "timing point needs time and beat length"));
        }

        let time = parse_time(fields[0], offset, "timing point time")?;
        let beat_len = parse_finite(fields[1], offset, "beat length")?;
        let field = |idx: usize| fields.get(idx).copied().filter(|f| !f.is_empty());

        let meter = match field(2) {
            Some(v) => parse_num::<u32>(v, offset, "meter")?,
            None => 4,
        };
        let sample_set = match field(3) {
            Some(v) => parse_num(v, offset, "sample set")?,
            None => 0,
        };
        let sample_index = match field(4) {
            Some(v) => parse_num(v, offset, "sample index")?,
            None => 0,
        };
        let volume = match field(5) {
            Some(v) => parse_num(v, offset, "volume")?,
            None => 100,
        };
        let uninherited = match field(6) {
            Some(v) => parse_num::<i32>(v, offset, "uninherited flag")? != 0,
            None => true,
        };
        let effects = match field(7) {
            Some(v) => parse_num::<u32>(v, offset, "effects")?,
            None => 0,
        };

        self.timing_points.push(TimingPoint {
            time,
            beat_len,
            meter: if meter == 0 { 4 } else { meter },
            sample_set,
            sample_index,
            volume,
            uninherited,
            kiai: effects & 1 != 0,
            omit_first_barline: effects & 8 != 0,
        });
        Ok(())
    }

    fn parse_colour(&mut self, line: &str, offset: usize) -> Result<()> {
        let Some((key, value)) = split_key_value(line) else {
            return Ok(());
        };
        if !key.starts_with("Combo") {
            return Ok(());
        }

        let channels: Vec<&str> = value.split(',').map(str::trim).collect();
        if channels.len() < 3 {
            return Err(Error::malformed(offset, format!("invalid colour: {:?}", value)));
        }
        self.combo_colors.push(Color {
            red: parse_num(channels[0], offset, "red channel")?,
            green: parse_num(channels[1], offset, "green channel")?,
            blue: parse_num(channels[2], offset, "blue channel")?,
        });
        Ok(())
    }

    fn parse_hit_object(&mut self, line: &str, offset: usize) -> Result<()> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 4 {
            return Err(Error::malformed(offset, "hit object needs x, y, time and type"));
        }

        let x = parse_finite(fields[0], offset, "x position")? as f32;
        let y = parse_finite(fields[1], offset, "y position")? as f32;
        let start_time = parse_time(fields[2], offset, "hit object time")?;
        let type_bits: u8 = parse_num(fields[3], offset, "hit object type")?;
        let hit_sound = match fields.get(4) {
            Some(v) if !v.is_empty() => parse_num(v, offset, "hit sound")?,
            _ => 0,
        };
        let pos = Pos2::new(x, y);

        let (kind, end_time) = if type_bits & TYPE_CIRCLE != 0 {
            (HitObjectKind::Circle, start_time)
        } else if type_bits & TYPE_SLIDER != 0 {
            (
                HitObjectKind::Slider(parse_slider(&fields, pos, offset)?),
                start_time,
            )
        } else if type_bits & TYPE_SPINNER != 0 {
            let end = fields
                .get(5)
                .ok_or_else(|| Error::malformed(offset, "spinner needs an end time"))?;
            let end_time = parse_time(end, offset, "spinner end time")?;
            (HitObjectKind::Spinner, end_time.max(start_time))
        } else if type_bits & TYPE_HOLD != 0 {
            let end = fields
                .get(5)
                .and_then(|f| f.split(':').next())
                .ok_or_else(|| Error::malformed(offset, "hold note needs an end time"))?;
            let end_time = parse_time(end, offset, "hold end time")?;
            (HitObjectKind::Hold, end_time.max(start_time))
        } else {
            tracing::warn!(type_bits, start_time, "Unknown hit object type, keeping placeholder");
            (HitObjectKind::Unknown { type_bits }, start_time)
        };

        self.hit_objects.push(HitObject {
            pos,
            start_time,
            end_time,
            new_combo: type_bits & TYPE_NEW_COMBO != 0,
            combo_offset: (type_bits & COMBO_OFFSET_MASK) >> 4,
            hit_sound,
            kind,
            stack_height: 0,
        });
        Ok(())
    }

    fn finish(mut self, format_version: u32, hash: String) -> Result<BeatmapRecord> {
        if !self.approach_rate_set {
            self.difficulty.approach_rate = self.difficulty.overall_difficulty;
        }

        // Stable sorts: ties keep file order
        self.timing_points.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.hit_objects
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

        for obj in &mut self.hit_objects {
            if let HitObjectKind::Slider(slider) = &mut obj.kind {
                apply_slider_timing(slider, obj.start_time, &self.timing_points, &self.difficulty);
                obj.end_time = obj.start_time + slider.span_duration * f64::from(slider.slides);
            }
        }

        let combo = total_combo(&self.hit_objects);
        if combo > u64::from(u32::MAX) {
            return Err(Error::malformed(0, format!("total combo {} does not fit 32 bits", combo)));
        }

        let mode = self.general.mode;
        let mut record = BeatmapRecord {
            format_version,
            hash,
            general: self.general,
            metadata: self.metadata,
            mode,
            difficulty: self.difficulty,
            background_file: self.background_file,
            timing_points: self.timing_points,
            breaks: self.breaks,
            combo_colors: self.combo_colors,
            hit_objects: self.hit_objects,
            n_circles: 0,
            n_sliders: 0,
            n_spinners: 0,
            max_combo: 0,
            map_length_ms: 0,
            drain_time_ms: 0,
            bpm: None,
            extra_resolved: false,
        };
        record.compute_derived();
        Ok(record)
    }
}

fn parse_slider(fields: &[&str], head: Pos2, offset: usize) -> Result<Slider> {
    if fields.len() < 7 {
        return Err(Error::malformed(offset, "slider needs curve and slide count"));
    }

    let mut curve_tokens = fields[5].split('|');
    let curve_type = curve_tokens
        .next()
        .and_then(CurveType::from_letter)
        .ok_or_else(|| Error::malformed(offset, format!("invalid slider curve: {:?}", fields[5])))?;

    let mut control_points = vec![head];
    for token in curve_tokens {
        let (x, y) = token
            .split_once(':')
            .ok_or_else(|| Error::malformed(offset, format!("invalid control point: {:?}", token)))?;
        let point = Pos2::new(
            parse_finite(x, offset, "control point x")? as f32,
            parse_finite(y, offset, "control point y")? as f32,
        );
        // Old maps repeat the head as the first control point
        if control_points.len() == 1 && point == head {
            continue;
        }
        control_points.push(point);
    }

    let slides: u32 = parse_num(fields[6], offset, "slide count")?;
    if slides == 0 {
        return Err(Error::malformed(offset, "slider slide count must be positive"));
    }
    if slides > MAX_SLIDES {
        return Err(Error::malformed(
            offset,
            format!("slider slide count {} exceeds {}", slides, MAX_SLIDES),
        ));
    }

    let pixel_len = match fields.get(7) {
        Some(v) if !v.is_empty() => parse_finite(v, offset, "slider length")?.max(0.0),
        _ => 0.0,
    };
    let pixel_len = if pixel_len > 0.0 {
        pixel_len
    } else {
        control_points
            .windows(2)
            .map(|w| f64::from(w[0].distance(w[1])))
            .sum()
    };

    let edge_sounds = match fields.get(8) {
        Some(v) if !v.is_empty() => v
            .split('|')
            .map(|s| parse_num::<u8>(s, offset, "edge sound"))
            .collect::<Result<Vec<_>>>()?,
        _ => Vec::new(),
    };

    Ok(Slider {
        curve_type,
        control_points,
        slides,
        pixel_len,
        edge_sounds,
        span_duration: 0.0,
        ticks_per_span: 0,
        path: None,
    })
}

fn apply_slider_timing(
    slider: &mut Slider,
    start_time: f64,
    timing_points: &[TimingPoint],
    difficulty: &BeatmapDifficulty,
) {
    let beat_len = beat_len_at(timing_points, start_time);
    let velocity = difficulty.slider_multiplier * 100.0 * slider_velocity_at(timing_points, start_time);

    slider.span_duration = if velocity > 0.0 {
        slider.pixel_len / velocity * beat_len
    } else {
        0.0
    };

    let tick_distance = velocity / difficulty.slider_tick_rate;
    slider.ticks_per_span = if tick_distance > 0.0 {
        let ticks = ((slider.pixel_len - 0.01) / tick_distance).floor();
        (ticks.max(0.0) as u32).min(MAX_TICKS_PER_SPAN)
    } else {
        0
    };
}

fn resolve_extra(record: &mut BeatmapRecord) {
    for obj in &mut record.hit_objects {
        if let HitObjectKind::Slider(slider) = &mut obj.kind {
            slider.path = Some(SliderPath::compute(
                slider.curve_type,
                &slider.control_points,
                slider.pixel_len,
            ));
        }
    }

    if record.mode == GameMode::Osu {
        apply_stacking(
            &mut record.hit_objects,
            record.difficulty.preempt(),
            record.general.stack_leniency,
        );
    }

    record.extra_resolved = true;
}
