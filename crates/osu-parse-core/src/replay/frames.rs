//! Replay input frames and the lazily decoded frame stream

use std::cell::OnceCell;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::cursor::decompress_lzma;
use crate::error::{Error, Result};

/// Delta value marking the frame that carries the RNG seed
pub const RNG_SEED_DELTA: i64 = -12345;

/// Position stable writes into the lead-in frames before the first real input
const SENTINEL_X: f32 = 256.0;
const SENTINEL_Y: f32 = -500.0;
const MAX_SENTINEL_FRAMES: usize = 2;

/// Buttons held during a frame (osu!standard layout)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Keys(u32);

bitflags::bitflags! {
    impl Keys: u32 {
        const M1 = 1;
        const M2 = 1 << 1;
        const K1 = 1 << 2;
        const K2 = 1 << 3;
        const SMOKE = 1 << 4;
    }
}

impl Keys {
    /// Whether any hit button (mouse or keyboard) is held.
    pub fn is_pressing(self) -> bool {
        self.intersects(Keys::M1 | Keys::M2 | Keys::K1 | Keys::K2)
    }
}

/// A single cursor/key sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    /// Absolute time in milliseconds since the start of the beatmap
    pub time: i64,
    /// Milliseconds since the previous frame
    pub delta: i64,
    pub x: f32,
    pub y: f32,
    pub keys: Keys,
}

/// Frames decoded from the compressed payload
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameData {
    pub frames: Vec<InputFrame>,
    pub rng_seed: Option<i64>,
}

/// The compressed frame block of a replay
///
/// Decompression happens on first access to [`FrameStream::frames`]; the
/// result is memoised for the lifetime of the owning record.
#[derive(Debug, Clone, Default)]
pub struct FrameStream {
    compressed: Vec<u8>,
    decoded: OnceCell<FrameData>,
}

impl FrameStream {
    pub fn new(compressed: Vec<u8>) -> Self {
        Self {
            compressed,
            decoded: OnceCell::new(),
        }
    }

    pub fn compressed(&self) -> &[u8] {
        &self.compressed
    }

    /// Whether the frames have already been decompressed.
    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }

    /// Decoded frames, decompressing on first call.
    ///
    /// A failed decode is not memoised and fails again on the next call.
    pub fn frames(&self) -> Result<&FrameData> {
        if let Some(data) = self.decoded.get() {
            return Ok(data);
        }

        let raw = decompress_lzma(&self.compressed)?;
        let data = parse_frames(&raw)?;
        tracing::debug!(
            frames = data.frames.len(),
            compressed = self.compressed.len(),
            "Decompressed replay frames"
        );
        Ok(self.decoded.get_or_init(|| data))
    }
}

impl PartialEq for FrameStream {
    fn eq(&self, other: &Self) -> bool {
        self.compressed == other.compressed
    }
}

impl Serialize for FrameStream {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("FrameStream", 2)?;
        state.serialize_field("compressed_len", &self.compressed.len())?;
        state.serialize_field("frames", &self.decoded.get())?;
        state.end()
    }
}

/// Parse decompressed `w|x|y|z,` records.
fn parse_frames(raw: &[u8]) -> Result<FrameData> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| Error::malformed(e.valid_up_to(), "frame data is not valid UTF-8"))?;

    let mut data = FrameData::default();
    let mut time: i64 = 0;
    let mut leading = true;
    let mut sentinels = 0;
    let mut offset = 0;

    for record in text.split(',') {
        let record_offset = offset;
        offset += record.len() + 1;

        let record = record.trim();
        if record.is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.split('|').collect();
        if fields.len() != 4 {
            return Err(Error::malformed(
                record_offset,
                format!("frame needs 4 fields: {:?}", record),
            ));
        }

        let delta = parse_integer(fields[0], record_offset)?;
        let x = parse_coord(fields[1], record_offset)?;
        let y = parse_coord(fields[2], record_offset)?;

        if delta == RNG_SEED_DELTA {
            data.rng_seed = Some(parse_integer(fields[3], record_offset)?);
            continue;
        }

        if leading && sentinels < MAX_SENTINEL_FRAMES && x == SENTINEL_X && y == SENTINEL_Y {
            sentinels += 1;
            continue;
        }
        leading = false;

        let keys = parse_integer(fields[3], record_offset)?;
        time = time
            .checked_add(delta)
            .ok_or_else(|| Error::malformed(record_offset, "frame time overflows"))?;
        if time < 0 {
            return Err(Error::malformed(
                record_offset,
                format!("negative frame time {}", time),
            ));
        }

        data.frames.push(InputFrame {
            time,
            delta,
            x,
            y,
            keys: Keys::from_bits_retain(keys as u32),
        });
    }

    Ok(data)
}

fn parse_integer(value: &str, offset: usize) -> Result<i64> {
    let value = value.trim();
    // lazer exports may write whole numbers with a fractional part
    value
        .parse::<i64>()
        .or_else(|_| match value.parse::<f64>() {
            Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
            _ => Err(()),
        })
        .map_err(|_| Error::malformed(offset, format!("invalid frame integer: {:?}", value)))
}

fn parse_coord(value: &str, offset: usize) -> Result<f32> {
    match value.trim().parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::malformed(offset, format!("invalid frame coordinate: {:?}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::test_support::compress_lzma;

    #[test]
    fn test_parse_frames_accumulates_time() {
        let data = parse_frames(b"0|256|-500|0,-1|256|-500|0,10|100|100|1,16|110|100|0,-12345|0|0|987,").unwrap();

        assert_eq!(data.rng_seed, Some(987));
        assert_eq!(data.frames.len(), 2);
        assert_eq!(data.frames[0].time, 10);
        assert_eq!(data.frames[1].time, 26);
        assert_eq!(data.frames[0].keys, Keys::M1);
        assert!(data.frames[0].keys.is_pressing());
        assert!(!data.frames[1].keys.is_pressing());
    }

    #[test]
    fn test_negative_time_is_malformed() {
        let err = parse_frames(b"5|0|0|0,-10|0|0|0,").unwrap_err();
        assert!(matches!(err, Error::MalformedEncoding { offset: 8, .. }));
    }

    #[test]
    fn test_sentinel_only_dropped_at_start() {
        let data = parse_frames(b"5|1|1|0,3|256|-500|0,").unwrap();
        assert_eq!(data.frames.len(), 2);
        assert_eq!(data.frames[1].time, 8);
    }

    #[test]
    fn test_bad_frame_record() {
        assert!(matches!(
            parse_frames(b"1|2|3,").unwrap_err(),
            Error::MalformedEncoding { .. }
        ));
        assert!(matches!(
            parse_frames(b"1|x|3|0,").unwrap_err(),
            Error::MalformedEncoding { .. }
        ));
    }

    #[test]
    fn test_smoke_only_is_not_pressing() {
        assert!(!Keys::SMOKE.is_pressing());
        assert!((Keys::K2 | Keys::SMOKE).is_pressing());
    }

    #[test]
    fn test_stream_memoises() {
        let stream = FrameStream::new(compress_lzma(b"16|1|2|4,16|3|4|0,"));
        assert!(!stream.is_decoded());

        let first = stream.frames().unwrap() as *const FrameData;
        assert!(stream.is_decoded());
        let second = stream.frames().unwrap() as *const FrameData;
        assert_eq!(first, second);
        assert_eq!(stream.frames().unwrap().frames[1].time, 32);
    }

    #[test]
    fn test_empty_stream_has_no_frames() {
        let stream = FrameStream::new(Vec::new());
        assert!(stream.frames().unwrap().frames.is_empty());
    }

    #[test]
    fn test_corrupt_stream_is_malformed() {
        let stream = FrameStream::new(vec![1, 2, 3, 4, 5]);
        assert!(matches!(
            stream.frames().unwrap_err(),
            Error::MalformedEncoding { .. }
        ));
        assert!(!stream.is_decoded());
    }
}
