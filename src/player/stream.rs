use crate::core::{AudioFrame, PipelineStats, PlayerError, SyncClock, VideoFrame};
use crate::player::actor::ActorHandle;
use crate::player::audio_output::AudioSink;
use crate::player::decoder::MediaDecoder;
use crate::player::extractor::MediaExtractor;
use log::error;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

/// 带显示时间戳的帧
pub trait TimedFrame {
    fn pts_us(&self) -> i64;
}

impl TimedFrame for AudioFrame {
    fn pts_us(&self) -> i64 {
        self.pts_us
    }
}

impl TimedFrame for VideoFrame {
    fn pts_us(&self) -> i64 {
        self.pts_us
    }
}

/// 帧队列 - 解码 Actor 生产，同步器独家消费
///
/// 同步器需要在不取出的前提下看队首 PTS（等待另一路首帧时），
/// 所以用锁保护的 VecDeque 而不是无锁队列。
pub struct FrameQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T: TimedFrame> FrameQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, frame: T) {
        self.inner.lock().push_back(frame);
    }

    pub fn pop(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// 队首帧的 PTS，不移除
    pub fn head_pts(&self) -> Option<i64> {
        self.inner.lock().front().map(|f| f.pts_us())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// 清空并返回丢弃的帧数
    pub fn clear(&self) -> usize {
        let mut q = self.inner.lock();
        let n = q.len();
        q.clear();
        n
    }
}

/// 单条流的状态：提取器 + 解码器 + 两个 EOS 标志
///
/// 正常运行期间只有本流的解封装/解码 Actor 访问；生命周期控制器
/// 只在六方集合点达成静止之后才触碰（flush/seek/release）。
pub(crate) struct StreamState {
    pub extractor: Mutex<Box<dyn MediaExtractor>>,
    pub decoder: Mutex<Box<dyn MediaDecoder>>,
    pub input_exhausted: AtomicBool,
    pub output_exhausted: AtomicBool,
}

impl StreamState {
    pub fn new(extractor: Box<dyn MediaExtractor>, decoder: Box<dyn MediaDecoder>) -> Self {
        Self {
            extractor: Mutex::new(extractor),
            decoder: Mutex::new(decoder),
            input_exhausted: AtomicBool::new(false),
            output_exhausted: AtomicBool::new(false),
        }
    }

    pub fn reset_eos(&self) {
        self.input_exhausted.store(false, Ordering::SeqCst);
        self.output_exhausted.store(false, Ordering::SeqCst);
    }
}

/// 六个 Actor 的发送句柄
pub(crate) struct Actors {
    pub demux: ActorHandle,
    pub audio_decode: ActorHandle,
    pub video_decode: ActorHandle,
    pub sync: ActorHandle,
    pub audio_render: ActorHandle,
    pub video_render: ActorHandle,
}

impl Actors {
    pub fn all(&self) -> [&ActorHandle; 6] {
        [
            &self.demux,
            &self.audio_decode,
            &self.video_decode,
            &self.sync,
            &self.audio_render,
            &self.video_render,
        ]
    }
}

/// 各阶段共享的流水线状态
pub(crate) struct PipelineShared {
    pub audio: StreamState,
    pub video: StreamState,
    pub audio_frames: FrameQueue<AudioFrame>,
    pub video_frames: FrameQueue<VideoFrame>,
    pub clock: SyncClock,
    pub audio_sink: Mutex<Box<dyn AudioSink>>,
    pub actors: Actors,
    pub stats: PipelineStats,
    pub failure: Mutex<Option<PlayerError>>,
}

impl PipelineShared {
    /// 记录致命缺陷（只保留第一个），上报后相关 Actor 停止自我调度
    pub fn report_fatal(&self, err: PlayerError) {
        error!("❌ 流水线致命错误: {}", err);
        let mut failure = self.failure.lock();
        if failure.is_none() {
            *failure = Some(err);
        }
    }

    pub fn has_failed(&self) -> bool {
        self.failure.lock().is_some()
    }
}
