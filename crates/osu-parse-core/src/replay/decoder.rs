//! `.osr` replay decoding

use crate::beatmap::GameMode;
use crate::cursor::ByteCursor;
use crate::error::{Error, FormatKind, Result};
use crate::mods::Mods;

use super::frames::FrameStream;
use super::model::{Judgements, LifeGraphPoint, ReplayRecord};

/// Oldest replay version accepted (`yyyymmdd`)
pub const MIN_REPLAY_VERSION: i32 = 20_070_101;
/// Newest replay version accepted
pub const MAX_REPLAY_VERSION: i32 = 39_999_999;

/// Versions from this date on write an `i64` online score id
const SCORE_ID_I64_VERSION: i32 = 20_140_721;
/// Versions from this date on write an `i32` online score id
const SCORE_ID_I32_VERSION: i32 = 20_121_008;

/// Decode the header of a `.osr` replay.
///
/// The frame block is kept compressed; it is decompressed on the first call
/// to [`FrameStream::frames`].
pub fn decode_replay(bytes: &[u8]) -> Result<ReplayRecord> {
    let mut cursor = ByteCursor::new(bytes);

    let mode_byte = cursor.read_u8()?;
    let mode = GameMode::from_id(mode_byte)
        .ok_or_else(|| Error::malformed(0, format!("invalid game mode byte: {}", mode_byte)))?;

    let version = cursor.read_i32()?;
    if !(MIN_REPLAY_VERSION..=MAX_REPLAY_VERSION).contains(&version) {
        return Err(Error::UnsupportedFormatVersion {
            format: FormatKind::Replay,
            version: i64::from(version),
        });
    }

    let beatmap_hash = cursor.read_var_string()?.unwrap_or_default();
    let player_name = cursor.read_var_string()?.unwrap_or_default();
    let replay_hash = cursor.read_var_string()?;

    let judgements = Judgements {
        count_300: cursor.read_u16()?,
        count_100: cursor.read_u16()?,
        count_50: cursor.read_u16()?,
        count_geki: cursor.read_u16()?,
        count_katu: cursor.read_u16()?,
        count_miss: cursor.read_u16()?,
    };

    let score = cursor.read_i32()?;
    let max_combo = cursor.read_u16()?;
    let perfect = cursor.read_u8()? != 0;
    let mods = Mods::from_bits_retain(cursor.read_i32()? as u32);

    let life_offset = cursor.position();
    let life_graph = match cursor.read_var_string()? {
        Some(text) => parse_life_graph(&text, life_offset)?,
        None => Vec::new(),
    };

    let timestamp = cursor.read_i64()?;

    let length_offset = cursor.position();
    let declared = cursor.read_i32()?;
    let declared = usize::try_from(declared).map_err(|_| {
        Error::malformed(length_offset, format!("negative payload length: {}", declared))
    })?;
    if declared > cursor.remaining() {
        return Err(Error::TruncatedPayload {
            declared,
            available: cursor.remaining(),
        });
    }
    let compressed = cursor.read_bytes(declared)?.to_vec();

    let online_score_id = if version >= SCORE_ID_I64_VERSION {
        Some(cursor.read_i64()?)
    } else if version >= SCORE_ID_I32_VERSION {
        Some(i64::from(cursor.read_i32()?))
    } else {
        None
    };

    let target_practice_accuracy = if mods.contains(Mods::TARGET_PRACTICE) {
        Some(cursor.read_f64()?)
    } else {
        None
    };

    if !cursor.is_empty() {
        tracing::debug!(trailing = cursor.remaining(), "Ignoring trailing replay bytes");
    }

    tracing::debug!(
        ?mode,
        version,
        player = %player_name,
        payload = declared,
        "Decoded replay header"
    );

    Ok(ReplayRecord {
        mode,
        version,
        beatmap_hash,
        player_name,
        replay_hash,
        judgements,
        score,
        max_combo,
        perfect,
        mods,
        life_graph,
        timestamp,
        online_score_id,
        target_practice_accuracy,
        frames: FrameStream::new(compressed),
    })
}

/// Parse `time|life,` pairs.
fn parse_life_graph(text: &str, offset: usize) -> Result<Vec<LifeGraphPoint>> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (time, life) = entry
                .split_once('|')
                .ok_or_else(|| Error::malformed(offset, format!("invalid life graph entry: {:?}", entry)))?;
            let time = time
                .trim()
                .parse::<i32>()
                .map_err(|_| Error::malformed(offset, format!("invalid life graph time: {:?}", time)))?;
            let life = life
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|l| l.is_finite())
                .ok_or_else(|| Error::malformed(offset, format!("invalid life graph value: {:?}", life)))?;
            Ok(LifeGraphPoint { time, life })
        })
        .collect()
}
