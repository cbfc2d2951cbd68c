//! `.osr` replay decoding and the lazily decoded frame stream

mod decoder;
mod frames;
mod model;

pub use decoder::{decode_replay, MAX_REPLAY_VERSION, MIN_REPLAY_VERSION};
pub use frames::{FrameData, FrameStream, InputFrame, Keys, RNG_SEED_DELTA};
pub use model::{Grade, Judgements, LifeGraphPoint, ReplayRecord};
