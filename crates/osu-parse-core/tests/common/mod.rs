//! Fixture builders shared by the integration tests.
//!
//! Beatmaps are written as `.osu` text and replays as `.osr` bytes, so every
//! test exercises the real decoders.

#![allow(dead_code)]

/// Append an osu! string: `0x00` for empty, otherwise `0x0b` + ULEB128 length + bytes.
pub fn write_string(buf: &mut Vec<u8>, s: &str) {
    if s.is_empty() {
        buf.push(0x00);
        return;
    }
    buf.push(0x0b);
    let mut len = s.len();
    loop {
        let mut byte = (len & 0x7F) as u8;
        len >>= 7;
        if len != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if len == 0 {
            break;
        }
    }
    buf.extend_from_slice(s.as_bytes());
}

pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut input = data;
    let mut output = Vec::new();
    lzma_rs::lzma_compress(&mut input, &mut output).expect("Failed to compress frames");
    output
}

/// One input frame at an absolute time
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub time: i64,
    pub x: f32,
    pub y: f32,
    pub keys: u32,
}

/// Frame payload text as stable writes it: two lead-in frames, the inputs
/// as deltas, then the RNG seed frame.
pub fn frame_payload(frames: &[Frame], seed: i64) -> String {
    let mut text = String::from("0|256|-500|0,-1|256|-500|0,");
    let mut last = 0;
    for frame in frames {
        text.push_str(&format!(
            "{}|{}|{}|{},",
            frame.time - last,
            frame.x,
            frame.y,
            frame.keys
        ));
        last = frame.time;
    }
    text.push_str(&format!("-12345|0|0|{},", seed));
    text
}

/// Builder for `.osr` replay bytes
#[derive(Debug, Clone)]
pub struct ReplayBuilder {
    pub mode: u8,
    pub version: i32,
    pub beatmap_hash: String,
    pub player_name: String,
    pub replay_hash: String,
    pub counts: [u16; 6],
    pub score: i32,
    pub max_combo: u16,
    pub perfect: bool,
    pub mods: u32,
    pub life_graph: String,
    pub timestamp: i64,
    pub frames: Vec<Frame>,
    pub score_id: i64,
}

impl Default for ReplayBuilder {
    fn default() -> Self {
        Self {
            mode: 0,
            version: 20_230_326,
            beatmap_hash: "0123456789abcdef0123456789abcdef".to_string(),
            player_name: "tester".to_string(),
            replay_hash: "fedcba9876543210fedcba9876543210".to_string(),
            counts: [3, 0, 0, 0, 0, 0],
            score: 30_000,
            max_combo: 3,
            perfect: true,
            mods: 0,
            life_graph: "0|1,1000|0.9,".to_string(),
            timestamp: 638_000_000_000_000_000,
            frames: Vec::new(),
            score_id: 4_000_000_000,
        }
    }
}

impl ReplayBuilder {
    pub fn build(&self) -> Vec<u8> {
        let mut buf = vec![self.mode];
        buf.extend_from_slice(&self.version.to_le_bytes());
        write_string(&mut buf, &self.beatmap_hash);
        write_string(&mut buf, &self.player_name);
        write_string(&mut buf, &self.replay_hash);
        for count in self.counts {
            buf.extend_from_slice(&count.to_le_bytes());
        }
        buf.extend_from_slice(&self.score.to_le_bytes());
        buf.extend_from_slice(&self.max_combo.to_le_bytes());
        buf.push(u8::from(self.perfect));
        buf.extend_from_slice(&self.mods.to_le_bytes());
        write_string(&mut buf, &self.life_graph);
        buf.extend_from_slice(&self.timestamp.to_le_bytes());

        let payload = compress(frame_payload(&self.frames, 1337).as_bytes());
        buf.extend_from_slice(&(payload.len() as i32).to_le_bytes());
        buf.extend_from_slice(&payload);
        buf.extend_from_slice(&self.score_id.to_le_bytes());
        buf
    }
}

/// A hit circle line for `[HitObjects]`
pub fn circle(x: i32, y: i32, time: i32) -> String {
    format!("{},{},{},1,0,0:0:0:0:", x, y, time)
}

/// Builder for `.osu` beatmap text
#[derive(Debug, Clone)]
pub struct BeatmapBuilder {
    pub version: u32,
    pub mode: u8,
    pub title: String,
    pub artist: String,
    pub creator: String,
    pub difficulty_name: String,
    pub hp: f64,
    pub cs: f64,
    pub od: f64,
    pub ar: Option<f64>,
    pub slider_multiplier: f64,
    pub tick_rate: f64,
    pub beat_length: f64,
    pub objects: Vec<String>,
}

impl Default for BeatmapBuilder {
    fn default() -> Self {
        Self {
            version: 14,
            mode: 0,
            title: "Fixture Song".to_string(),
            artist: "Fixture Artist".to_string(),
            creator: "mapper".to_string(),
            difficulty_name: "Insane".to_string(),
            hp: 5.0,
            cs: 4.0,
            od: 5.0,
            ar: Some(9.0),
            slider_multiplier: 1.4,
            tick_rate: 1.0,
            beat_length: 500.0,
            objects: Vec::new(),
        }
    }
}

impl BeatmapBuilder {
    pub fn with_objects(objects: Vec<String>) -> Self {
        Self {
            objects,
            ..Default::default()
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut text = format!("osu file format v{}\n\n", self.version);
        text.push_str(&format!(
            "[General]\nAudioFilename: audio.mp3\nStackLeniency: 0.7\nMode: {}\n\n",
            self.mode
        ));
        text.push_str(&format!(
            "[Metadata]\nTitle:{}\nArtist:{}\nCreator:{}\nVersion:{}\nTags:fixture test\nBeatmapID:123\n\n",
            self.title, self.artist, self.creator, self.difficulty_name
        ));
        text.push_str(&format!(
            "[Difficulty]\nHPDrainRate:{}\nCircleSize:{}\nOverallDifficulty:{}\n",
            self.hp, self.cs, self.od
        ));
        if let Some(ar) = self.ar {
            text.push_str(&format!("ApproachRate:{}\n", ar));
        }
        text.push_str(&format!(
            "SliderMultiplier:{}\nSliderTickRate:{}\n\n",
            self.slider_multiplier, self.tick_rate
        ));
        text.push_str(&format!(
            "[TimingPoints]\n0,{},4,2,0,60,1,0\n\n[HitObjects]\n",
            self.beat_length
        ));
        for object in &self.objects {
            text.push_str(object);
            text.push('\n');
        }
        text.into_bytes()
    }
}

/// Circles at `count` evenly spaced times, alternating between two positions.
pub fn stream(count: usize, spacing: i32) -> Vec<String> {
    (0..count)
        .map(|i| {
            let x = if i % 2 == 0 { 200 } else { 300 };
            circle(x, 192, 1000 + i as i32 * spacing)
        })
        .collect()
}
