//! 音视频同步播放核心
//!
//! 把容器文件拆成音频/视频两条基本流，各自独立解码，再按墙钟
//! 同步渲染。六个独立调度的 Actor（解封装、音频解码、视频解码、
//! 同步、音频渲染、视频渲染）串起 解封装 → 解码 → 同步 → 渲染
//! 的单向数据流；[`PlaybackPipeline`] 负责 play/pause/seek/release
//! 的生命周期编排。
//!
//! 容器解析、编解码、音频设备都是外部能力（[`MediaExtractor`]、
//! [`MediaDecoder`]、[`AudioSink`]），核心只依赖它们的操作契约；
//! 宿主界面与渲染表面同样在核心之外，渲染目标只作为不透明句柄
//! 透传给视频解码器。

pub mod core;
pub mod player;

pub use crate::core::{
    AudioFrame, AudioSinkConfig, PipelineState, PlayerError, Result, SampleFormat, SeekMode,
    StatsSnapshot, SyncClock, TrackInfo, TrackKind, VideoFrame,
};
pub use crate::player::{
    first_audio_track, first_video_track, AudioSink, AudioSinkProvider, CpalAudioOutput,
    CpalSinkProvider, DecoderEvent, DecoderProvider, ExtractorSupplier, MediaDecoder,
    MediaExtractor, PlaybackPipeline, RenderTarget,
};
