use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Seek 的关键帧对齐方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekMode {
    /// 对齐到目标之前最近的关键帧
    PreviousSync,
    /// 对齐到目标之后最近的关键帧
    NextSync,
    /// 对齐到离目标最近的关键帧
    ClosestSync,
}

/// 轨道类型（按 mime 前缀区分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
    Other,
}

/// 轨道元信息（由提取器枚举得到）
#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub mime: String,
    pub duration_us: i64,       // 轨道声明时长（微秒）

    // 音频轨道参数（视频轨道为 0）
    pub sample_rate: u32,
    pub channels: u16,

    // 视频轨道参数（音频轨道为 0）
    pub width: u32,
    pub height: u32,
}

impl TrackInfo {
    pub fn kind(&self) -> TrackKind {
        if self.mime.starts_with("audio/") {
            TrackKind::Audio
        } else if self.mime.starts_with("video/") {
            TrackKind::Video
        } else {
            TrackKind::Other
        }
    }
}

/// 音频采样格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    F32,
    I16,
}

/// 音频输出设备配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSinkConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub format: SampleFormat,
}

/// 解码完成、等待渲染的音频帧
///
/// `data` 是解码器输出缓冲区有效区域的拷贝；`buffer_id` 在渲染（或丢弃）后
/// 必须且只能归还解码器一次。
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub data: Vec<u8>,          // 原始 PCM 采样字节
    pub buffer_id: usize,
    pub pts_us: i64,            // 显示时间戳（微秒）
}

/// 解码完成、等待显示的视频帧
///
/// 图像数据留在解码器/渲染目标内部，不拷贝出来，只记录缓冲区句柄。
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame {
    pub buffer_id: usize,
    pub pts_us: i64,
}

/// 流水线生命周期状态
///
/// `Constructed → Playing ⇄ Paused → Released`，Released 为终态
/// （release 消耗所有权，之后任何操作都无法再被调用）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineState {
    Constructed,
    Playing,
    Paused,
    Released,
}

/// 观测计数器（仅用于监控和调试，不参与功能逻辑）
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub demuxed: AtomicU64,     // 送入解码器的压缩样本数
    pub decoded: AtomicU64,     // 进入帧队列的解码帧数
    pub rendered: AtomicU64,    // 实际渲染的帧数
    pub dropped: AtomicU64,     // 因迟到被丢弃的视频帧数
}

/// 计数器的一致性快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub demuxed: u64,
    pub decoded: u64,
    pub rendered: u64,
    pub dropped: u64,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            demuxed: self.demuxed.load(Ordering::Relaxed),
            decoded: self.decoded.load(Ordering::Relaxed),
            rendered: self.rendered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}
