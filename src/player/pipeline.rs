use crate::core::{
    AudioSinkConfig, PipelineState, PlayerError, Result, SampleFormat, SeekMode, StatsSnapshot,
    SyncClock,
};
use crate::player::actor::Actor;
use crate::player::audio_output::AudioSinkProvider;
use crate::player::decode::{post_decode_audio, post_decode_video};
use crate::player::decoder::{DecoderProvider, RenderTarget};
use crate::player::demux::{post_extract_audio, post_extract_video};
use crate::player::extractor::{first_audio_track, first_video_track, ExtractorSupplier};
use crate::player::stream::{Actors, FrameQueue, PipelineShared, StreamState};
use crossbeam_channel::bounded;
use log::{debug, info, warn};
use std::process;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn log_ctx() -> String {
    format!("[pid:{}-tid:{:?}]", process::id(), thread::current().id())
}

/// 暂停/释放握手的等待上限，超时视为致命的握手失败
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// 播放流水线 - 生命周期控制器
///
/// 持有六个 Actor（解封装、音频解码、视频解码、同步、音频渲染、
/// 视频渲染）和两条流的全部资源，负责 play/pause/seek/restart/release
/// 的编排。对共享状态的改动（flush/seek/teardown）一律先通过六方
/// 集合点达成静止，绝不允许只停一部分 Actor。
///
/// 状态机：`Constructed → Playing ⇄ Paused → Released`。
/// `release` 消耗所有权，释放后的调用在编译期就不可能发生。
pub struct PlaybackPipeline {
    shared: Arc<PipelineShared>,
    actor_threads: Vec<Actor>,
    state: PipelineState,
    duration_us: i64,
}

impl PlaybackPipeline {
    /// 构建流水线：选轨、建解码器、开音频设备、起六个 Actor
    ///
    /// 源里缺少音频或视频轨道、声道数不受支持，都是构造期的致命
    /// 配置缺陷，直接返回错误，不会启动任何 Actor。
    pub fn new(
        extractor_supplier: ExtractorSupplier,
        decoder_provider: &dyn DecoderProvider,
        audio_sink_provider: &dyn AudioSinkProvider,
        render_target: Arc<dyn RenderTarget>,
    ) -> Result<Self> {
        info!("{} 🎮 创建播放流水线...", log_ctx());

        // 用一个探测游标枚举轨道，两条流各自再开独立游标
        let probe = extractor_supplier()?;
        let audio_track = first_audio_track(probe.as_ref()).ok_or(PlayerError::NoAudioTrack)?;
        let video_track = first_video_track(probe.as_ref()).ok_or(PlayerError::NoVideoTrack)?;
        drop(probe);

        let mut audio_extractor = extractor_supplier()?;
        audio_extractor.select_track(audio_track);
        let audio_info = audio_extractor.track_info(audio_track);

        let mut video_extractor = extractor_supplier()?;
        video_extractor.select_track(video_track);
        let video_info = video_extractor.track_info(video_track);

        if !matches!(audio_info.channels, 1 | 2) {
            return Err(PlayerError::UnsupportedChannelCount(audio_info.channels));
        }

        let audio_decoder = decoder_provider.create_decoder(&audio_info, None)?;
        let video_decoder =
            decoder_provider.create_decoder(&video_info, Some(render_target))?;

        let sink_config = AudioSinkConfig {
            sample_rate: audio_info.sample_rate,
            channels: audio_info.channels,
            format: SampleFormat::I16,
        };
        let audio_sink = audio_sink_provider.open(&sink_config)?;

        let duration_us = audio_info.duration_us.max(video_info.duration_us);
        info!(
            "{} 媒体时长: {} ms (音频 {} us, 视频 {} us)",
            log_ctx(),
            duration_us / 1000,
            audio_info.duration_us,
            video_info.duration_us
        );

        let actor_threads = vec![
            Actor::spawn("demux"),
            Actor::spawn("audio-decode"),
            Actor::spawn("video-decode"),
            Actor::spawn("sync"),
            Actor::spawn("audio-render"),
            Actor::spawn("video-render"),
        ];
        let actors = Actors {
            demux: actor_threads[0].handle(),
            audio_decode: actor_threads[1].handle(),
            video_decode: actor_threads[2].handle(),
            sync: actor_threads[3].handle(),
            audio_render: actor_threads[4].handle(),
            video_render: actor_threads[5].handle(),
        };

        let shared = Arc::new(PipelineShared {
            audio: StreamState::new(audio_extractor, audio_decoder),
            video: StreamState::new(video_extractor, video_decoder),
            audio_frames: FrameQueue::new(),
            video_frames: FrameQueue::new(),
            clock: SyncClock::new(),
            audio_sink: parking_lot::Mutex::new(audio_sink),
            actors,
            stats: Default::default(),
            failure: parking_lot::Mutex::new(None),
        });

        info!("{} ✅ 播放流水线创建完成", log_ctx());
        Ok(Self {
            shared,
            actor_threads,
            state: PipelineState::Constructed,
            duration_us,
        })
    }

    /// 从头开始播放（Constructed/Paused → Playing）
    pub fn play(&mut self) -> Result<()> {
        if self.state == PipelineState::Playing {
            warn!("{} play() 忽略：已在播放中", log_ctx());
            return Ok(());
        }
        info!("{} 🎬 播放", log_ctx());

        self.shared.audio.reset_eos();
        self.shared.video.reset_eos();
        self.shared.clock.reset();

        self.shared.audio.decoder.lock().start()?;
        self.shared.video.decoder.lock().start()?;

        // 上个周期残留的帧持有已被 flush 作废的缓冲区 id，直接丢弃
        let cleared = self.shared.audio_frames.clear() + self.shared.video_frames.clear();
        if cleared > 0 {
            debug!("{} 🧹 清空帧队列: {} 帧", log_ctx(), cleared);
        }

        self.kick_stream_actors();
        self.state = PipelineState::Playing;
        Ok(())
    }

    /// 暂停播放（Playing → Paused）
    ///
    /// 六方集合点：往每个 Actor 队首插一个握手任务，六个任务在
    /// 屏障上会齐后各自丢弃自己剩余的排队任务，再逐一向控制器
    /// 报到。全部报到之前不做任何状态改动；之后才 flush 解码器、
    /// 暂停音频设备，此时不再有 Actor 持着缓冲区引用。
    pub fn pause(&mut self) -> Result<()> {
        if self.state != PipelineState::Playing {
            return Ok(());
        }
        info!("{} ⏸️  暂停", log_ctx());

        let barrier = Arc::new(Barrier::new(6));
        let (done_tx, done_rx) = bounded::<()>(6);

        for handle in self.shared.actors.all() {
            let barrier = barrier.clone();
            let own = handle.clone();
            let done = done_tx.clone();
            handle.post_front(move || {
                barrier.wait();
                own.clear_pending();
                let _ = done.send(());
            });
        }
        drop(done_tx);

        for _ in 0..6 {
            if done_rx.recv_timeout(HANDSHAKE_TIMEOUT).is_err() {
                self.shared.report_fatal(PlayerError::HandshakeTimeout);
                return Err(PlayerError::HandshakeTimeout);
            }
        }

        // 六方都已静止，现在才能安全地丢弃在途缓冲区
        self.shared.video.decoder.lock().flush();
        self.shared.audio.decoder.lock().flush();
        self.shared.audio_sink.lock().pause();

        let stats = self.shared.stats.snapshot();
        debug!(
            "{} 暂停完成: demux={} decode={} render={} drop={}",
            log_ctx(),
            stats.demuxed,
            stats.decoded,
            stats.rendered,
            stats.dropped
        );

        self.state = PipelineState::Paused;
        Ok(())
    }

    /// 跳转到指定位置（隐含先暂停，完成后继续播放）
    ///
    /// 目标被夹到 `[0, duration]`。先按关键帧模式重定位视频提取器
    /// 并前进一个样本，再用它落点的样本时间戳同样地重定位音频
    /// 提取器，保证两条流对齐到同一个解码点。
    pub fn seek_to(&mut self, position_ms: i64, mode: SeekMode) -> Result<()> {
        if !matches!(self.state, PipelineState::Playing | PipelineState::Paused) {
            return Err(PlayerError::Other(
                "seek 只能在播放或暂停状态调用".to_string(),
            ));
        }
        info!("{} 🎯 Seek 到 {} ms ({:?})", log_ctx(), position_ms, mode);

        self.pause()?;

        let target_us = position_ms.clamp(0, self.duration_us / 1000) * 1000;

        let aligned_us = {
            let mut video = self.shared.video.extractor.lock();
            video.seek_to(target_us, mode);
            video.advance();
            video.sample_time_us()
        };
        {
            let mut audio = self.shared.audio.extractor.lock();
            audio.seek_to(aligned_us, mode);
            audio.advance();
        }
        debug!(
            "{} Seek 对齐: 目标={}us, 视频落点={}us",
            log_ctx(),
            target_us,
            aligned_us
        );

        // 暂停时的 flush 已作废队列里的缓冲区 id，不能再分发
        let cleared = self.shared.audio_frames.clear() + self.shared.video_frames.clear();
        if cleared > 0 {
            debug!("{} 🧹 Seek 清空帧队列: {} 帧", log_ctx(), cleared);
        }

        self.shared.clock.reset();
        self.shared.audio.reset_eos();
        self.shared.video.reset_eos();

        self.kick_stream_actors();
        self.state = PipelineState::Playing;
        Ok(())
    }

    /// 从当前位置继续（Paused → Playing）
    ///
    /// 只重置时钟并重新踢动解封装/解码，不清队列、不动 EOS 标志，
    /// 让暂停前已解码的输出继续排空。
    pub fn restart(&mut self) -> Result<()> {
        if self.state != PipelineState::Paused {
            return Err(PlayerError::Other(
                "restart 只能在暂停状态调用".to_string(),
            ));
        }
        info!("{} ▶️  继续播放", log_ctx());

        self.shared.clock.reset();
        self.kick_stream_actors();
        self.state = PipelineState::Playing;
        Ok(())
    }

    /// 释放流水线（终态）
    ///
    /// 消耗所有权：往每个 Actor 队首插入退出任务，等六个工作线程
    /// 全部结束后，清空帧队列、停掉解码器和音频设备；提取器随
    /// 所有权一起释放。所有资源恰好释放一次。
    pub fn release(mut self) -> Result<()> {
        info!("{} ⏹️  释放流水线", log_ctx());

        let (done_tx, done_rx) = bounded::<()>(6);
        for handle in self.shared.actors.all() {
            let own = handle.clone();
            let done = done_tx.clone();
            handle.post_front(move || {
                own.quit();
                let _ = done.send(());
            });
        }
        drop(done_tx);

        for _ in 0..6 {
            if done_rx.recv_timeout(HANDSHAKE_TIMEOUT).is_err() {
                self.shared.report_fatal(PlayerError::HandshakeTimeout);
                return Err(PlayerError::HandshakeTimeout);
            }
        }

        for actor in &mut self.actor_threads {
            actor.join();
        }

        let cleared = self.shared.audio_frames.clear() + self.shared.video_frames.clear();
        if cleared > 0 {
            debug!("{} 🗑️  释放时丢弃 {} 帧", log_ctx(), cleared);
        }

        self.shared.audio.decoder.lock().stop();
        self.shared.video.decoder.lock().stop();
        self.shared.audio_sink.lock().stop();

        self.state = PipelineState::Released;
        info!("{} ✅ 释放完成，所有 Actor 已退出", log_ctx());
        Ok(())
    }

    /// 媒体总时长（两条轨道声明时长的较大者，构造时定死）
    pub fn duration(&self) -> Duration {
        Duration::from_micros(self.duration_us.max(0) as u64)
    }

    /// 当前播放位置；时钟尚未建立时为 None
    pub fn position(&self) -> Option<Duration> {
        self.shared.clock.position()
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PipelineState::Playing
    }

    /// 观测计数快照（仅监控用）
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// 取走某个阶段上报的致命错误（若有）
    pub fn take_fatal(&self) -> Option<PlayerError> {
        self.shared.failure.lock().take()
    }

    /// 踢动两条流的解封装/解码 Actor；同步与渲染 Actor 在帧流动
    /// 起来之后被动激活
    fn kick_stream_actors(&self) {
        post_extract_audio(&self.shared, Duration::ZERO);
        post_extract_video(&self.shared, Duration::ZERO);
        post_decode_audio(&self.shared, Duration::ZERO);
        post_decode_video(&self.shared, Duration::ZERO);
    }
}
