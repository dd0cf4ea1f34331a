//! Video domain: frame extraction plus cross-frame sentence dedup.

mod frames;
mod sampler;

pub use frames::{parse_duration, FfmpegFrameSource, FrameSource};
pub use sampler::{VideoSampler, VideoScan};
