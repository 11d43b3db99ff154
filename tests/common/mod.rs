//! 测试用的能力 Mock：提取器、解码器、音频设备、渲染目标
//!
//! 每个 Mock 都带一个探针（probe），流水线拿走所有权之后测试仍能
//! 观察调用历史；`alive` 计数在创建时 +1、Drop 时 -1，用来断言
//! release 后资源归零。

#![allow(dead_code)]

use av_player_core::{
    AudioSink, AudioSinkConfig, AudioSinkProvider, DecoderEvent, DecoderProvider,
    ExtractorSupplier, MediaDecoder, MediaExtractor, PlaybackPipeline, PlayerError, RenderTarget,
    Result, SeekMode, TrackInfo, TrackKind,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub const AUDIO_TRACK: usize = 0;
pub const VIDEO_TRACK: usize = 1;

/// 轮询等待条件成立
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ==================== 媒体源脚本 ====================

#[derive(Clone)]
pub struct TrackScript {
    pub info: TrackInfo,
    /// (pts_us, 样本字节数)
    pub samples: Vec<(i64, usize)>,
    /// 关键帧样本下标；空表示每个样本都是关键帧
    pub keyframes: Vec<usize>,
}

#[derive(Clone)]
pub struct MockSource {
    pub tracks: Vec<TrackScript>,
}

pub fn audio_track_info(duration_us: i64) -> TrackInfo {
    TrackInfo {
        mime: "audio/mp4a-latm".to_string(),
        duration_us,
        sample_rate: 44100,
        channels: 2,
        width: 0,
        height: 0,
    }
}

pub fn video_track_info(duration_us: i64) -> TrackInfo {
    TrackInfo {
        mime: "video/avc".to_string(),
        duration_us,
        sample_rate: 0,
        channels: 0,
        width: 1280,
        height: 720,
    }
}

/// 默认测试源：音频 10,000 ms / 视频 9,800 ms
pub fn default_source() -> MockSource {
    MockSource {
        tracks: vec![
            TrackScript {
                info: audio_track_info(10_000_000),
                samples: (0..100).map(|i| (i * 23_000, 256)).collect(),
                keyframes: vec![],
            },
            TrackScript {
                info: video_track_info(9_800_000),
                // 30fps，每 30 帧一个关键帧
                samples: (0..100).map(|i| (i * 33_000, 4096)).collect(),
                keyframes: (0..100).step_by(30).collect(),
            },
        ],
    }
}

// ==================== Mock 提取器 ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekRecord {
    pub track: usize,
    pub time_us: i64,
    pub mode: SeekMode,
}

pub struct MockExtractor {
    source: Arc<MockSource>,
    selected: Option<usize>,
    cursor: usize,
    seek_log: Arc<Mutex<Vec<SeekRecord>>>,
    alive: Arc<AtomicUsize>,
}

impl MockExtractor {
    fn new(
        source: Arc<MockSource>,
        seek_log: Arc<Mutex<Vec<SeekRecord>>>,
        alive: Arc<AtomicUsize>,
    ) -> Self {
        alive.fetch_add(1, Ordering::SeqCst);
        Self {
            source,
            selected: None,
            cursor: 0,
            seek_log,
            alive,
        }
    }

    fn track(&self) -> &TrackScript {
        &self.source.tracks[self.selected.expect("未选择轨道")]
    }
}

impl Drop for MockExtractor {
    fn drop(&mut self) {
        self.alive.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MediaExtractor for MockExtractor {
    fn track_count(&self) -> usize {
        self.source.tracks.len()
    }

    fn track_info(&self, index: usize) -> TrackInfo {
        self.source.tracks[index].info.clone()
    }

    fn select_track(&mut self, index: usize) {
        self.selected = Some(index);
        self.cursor = 0;
    }

    fn read_sample(&mut self, buf: &mut Vec<u8>) -> Result<Option<usize>> {
        let track = self.track();
        match track.samples.get(self.cursor) {
            None => Ok(None),
            Some(&(pts, size)) => {
                buf.clear();
                buf.resize(size, (pts % 251) as u8);
                Ok(Some(size))
            }
        }
    }

    fn sample_time_us(&self) -> i64 {
        self.track()
            .samples
            .get(self.cursor)
            .map(|&(pts, _)| pts)
            .unwrap_or(-1)
    }

    fn advance(&mut self) -> bool {
        self.cursor += 1;
        self.cursor < self.track().samples.len()
    }

    fn seek_to(&mut self, time_us: i64, mode: SeekMode) {
        let selected = self.selected.expect("未选择轨道");
        self.seek_log.lock().unwrap().push(SeekRecord {
            track: selected,
            time_us,
            mode,
        });

        let track = &self.source.tracks[selected];
        let keyframes: Vec<usize> = if track.keyframes.is_empty() {
            (0..track.samples.len()).collect()
        } else {
            track.keyframes.clone()
        };

        let previous = keyframes
            .iter()
            .rev()
            .find(|&&i| track.samples[i].0 <= time_us)
            .copied();
        let next = keyframes
            .iter()
            .find(|&&i| track.samples[i].0 >= time_us)
            .copied();

        self.cursor = match mode {
            SeekMode::PreviousSync => previous.or(next),
            SeekMode::NextSync => next.or(previous),
            SeekMode::ClosestSync => match (previous, next) {
                (Some(p), Some(n)) => {
                    let dp = time_us - track.samples[p].0;
                    let dn = track.samples[n].0 - time_us;
                    Some(if dp <= dn { p } else { n })
                }
                (p, n) => p.or(n),
            },
        }
        .unwrap_or(0);
    }
}

// ==================== Mock 解码器 ====================

/// 脚本化输出：start() 之后 delay 时刻起可被 dequeue 到
#[derive(Clone)]
pub struct ScriptedOutput {
    pub delay: Duration,
    pub pts_us: i64,
    pub data: Vec<u8>,
    pub end_of_stream: bool,
    /// true 时该次 dequeue 返回契约外错误（致命路径测试用）
    pub fail: bool,
}

pub fn output(delay_ms: u64, pts_us: i64) -> ScriptedOutput {
    ScriptedOutput {
        delay: Duration::from_millis(delay_ms),
        pts_us,
        data: vec![0u8; 64],
        end_of_stream: false,
        fail: false,
    }
}

pub fn eos_output(delay_ms: u64) -> ScriptedOutput {
    ScriptedOutput {
        delay: Duration::from_millis(delay_ms),
        pts_us: -1,
        data: vec![],
        end_of_stream: true,
        fail: false,
    }
}

pub fn failing_output(delay_ms: u64) -> ScriptedOutput {
    ScriptedOutput {
        delay: Duration::from_millis(delay_ms),
        pts_us: -1,
        data: vec![],
        end_of_stream: false,
        fail: true,
    }
}

/// 解码器调用历史，测试侧持有
#[derive(Default)]
pub struct DecoderProbe {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub flushes: AtomicUsize,
    pub queued_inputs: Mutex<Vec<(i64, usize, bool)>>,
    /// 正常归还的 (buffer_id, render) 历史
    pub released: Mutex<Vec<(usize, bool)>>,
    /// flush 作废后的归还（按无操作处理）
    pub stale_releases: AtomicUsize,
    /// 同一 id 未经 flush 的重复归还（缺陷，应恒为 0）
    pub double_releases: AtomicUsize,
}

impl DecoderProbe {
    pub fn rendered_count(&self) -> usize {
        self.released
            .lock()
            .unwrap()
            .iter()
            .filter(|&&(_, render)| render)
            .count()
    }

    pub fn discarded_count(&self) -> usize {
        self.released
            .lock()
            .unwrap()
            .iter()
            .filter(|&&(_, render)| !render)
            .count()
    }

    pub fn eos_queued(&self) -> bool {
        self.queued_inputs
            .lock()
            .unwrap()
            .iter()
            .any(|&(_, _, eos)| eos)
    }
}

const INPUT_SLOTS: usize = 4;
/// 输出缓冲区 id 与输入槽位区分开
const OUTPUT_ID_BASE: usize = 100;

pub struct MockDecoder {
    probe: Arc<DecoderProbe>,
    script: Vec<ScriptedOutput>,
    next_output: usize,
    started_at: Option<Instant>,
    free_slots: VecDeque<usize>,
    slot_buffers: Vec<Vec<u8>>,
    output_data: HashMap<usize, Vec<u8>>,
    outstanding: HashSet<usize>,
    invalidated: HashSet<usize>,
    alive: Arc<AtomicUsize>,
}

impl MockDecoder {
    fn new(script: Vec<ScriptedOutput>, probe: Arc<DecoderProbe>, alive: Arc<AtomicUsize>) -> Self {
        alive.fetch_add(1, Ordering::SeqCst);
        Self {
            probe,
            script,
            next_output: 0,
            started_at: None,
            free_slots: (0..INPUT_SLOTS).collect(),
            slot_buffers: vec![Vec::new(); INPUT_SLOTS],
            output_data: HashMap::new(),
            outstanding: HashSet::new(),
            invalidated: HashSet::new(),
            alive,
        }
    }
}

impl Drop for MockDecoder {
    fn drop(&mut self) {
        self.alive.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MediaDecoder for MockDecoder {
    fn start(&mut self) -> Result<()> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        self.started_at = None;
    }

    fn flush(&mut self) {
        self.probe.flushes.fetch_add(1, Ordering::SeqCst);
        // flush 作废所有在途输出缓冲区
        self.invalidated.extend(self.outstanding.drain());
        self.free_slots = (0..INPUT_SLOTS).collect();
    }

    fn dequeue_input(&mut self) -> Result<Option<usize>> {
        Ok(self.free_slots.pop_front())
    }

    fn input_buffer(&mut self, slot: usize) -> &mut Vec<u8> {
        &mut self.slot_buffers[slot]
    }

    fn queue_input(&mut self, slot: usize, size: usize, pts_us: i64, end_of_stream: bool)
        -> Result<()> {
        self.probe
            .queued_inputs
            .lock()
            .unwrap()
            .push((pts_us, size, end_of_stream));
        // 脚本化解码：输入立即消费，槽位马上回收
        self.free_slots.push_back(slot);
        Ok(())
    }

    fn dequeue_output(&mut self) -> Result<DecoderEvent> {
        let Some(started_at) = self.started_at else {
            return Ok(DecoderEvent::TryAgainLater);
        };
        let Some(entry) = self.script.get(self.next_output) else {
            return Ok(DecoderEvent::TryAgainLater);
        };
        if started_at.elapsed() < entry.delay {
            return Ok(DecoderEvent::TryAgainLater);
        }
        if entry.fail {
            self.next_output += 1;
            return Err(PlayerError::DecoderError(
                "unexpected result from dequeue_output: -1001".to_string(),
            ));
        }

        let buffer_id = OUTPUT_ID_BASE + self.next_output;
        self.output_data.insert(buffer_id, entry.data.clone());
        self.outstanding.insert(buffer_id);
        let event = DecoderEvent::OutputAvailable {
            buffer_id,
            pts_us: entry.pts_us,
            end_of_stream: entry.end_of_stream,
        };
        self.next_output += 1;
        Ok(event)
    }

    fn output_buffer(&self, buffer_id: usize) -> &[u8] {
        self.output_data
            .get(&buffer_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn release_output(&mut self, buffer_id: usize, render: bool) {
        if self.invalidated.remove(&buffer_id) {
            // 契约：flush 作废的 id 归还按无操作处理
            self.probe.stale_releases.fetch_add(1, Ordering::SeqCst);
        } else if self.outstanding.remove(&buffer_id) {
            self.output_data.remove(&buffer_id);
            self.probe
                .released
                .lock()
                .unwrap()
                .push((buffer_id, render));
        } else {
            self.probe.double_releases.fetch_add(1, Ordering::SeqCst);
        }
    }
}

pub struct MockDecoderProvider {
    audio_script: Mutex<Option<Vec<ScriptedOutput>>>,
    video_script: Mutex<Option<Vec<ScriptedOutput>>>,
    audio_probe: Arc<DecoderProbe>,
    video_probe: Arc<DecoderProbe>,
    video_got_target: AtomicBool,
    alive: Arc<AtomicUsize>,
}

impl MockDecoderProvider {
    pub fn new(
        audio_script: Vec<ScriptedOutput>,
        video_script: Vec<ScriptedOutput>,
        alive: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            audio_script: Mutex::new(Some(audio_script)),
            video_script: Mutex::new(Some(video_script)),
            audio_probe: Arc::new(DecoderProbe::default()),
            video_probe: Arc::new(DecoderProbe::default()),
            video_got_target: AtomicBool::new(false),
            alive,
        }
    }

    pub fn audio_probe(&self) -> Arc<DecoderProbe> {
        self.audio_probe.clone()
    }

    pub fn video_probe(&self) -> Arc<DecoderProbe> {
        self.video_probe.clone()
    }

    pub fn video_got_target(&self) -> bool {
        self.video_got_target.load(Ordering::SeqCst)
    }
}

impl DecoderProvider for MockDecoderProvider {
    fn create_decoder(
        &self,
        track: &TrackInfo,
        target: Option<Arc<dyn RenderTarget>>,
    ) -> Result<Box<dyn MediaDecoder>> {
        match track.kind() {
            TrackKind::Audio => {
                let script = self
                    .audio_script
                    .lock()
                    .unwrap()
                    .take()
                    .expect("音频解码器只应创建一次");
                Ok(Box::new(MockDecoder::new(
                    script,
                    self.audio_probe.clone(),
                    self.alive.clone(),
                )))
            }
            TrackKind::Video => {
                self.video_got_target
                    .store(target.is_some(), Ordering::SeqCst);
                let script = self
                    .video_script
                    .lock()
                    .unwrap()
                    .take()
                    .expect("视频解码器只应创建一次");
                Ok(Box::new(MockDecoder::new(
                    script,
                    self.video_probe.clone(),
                    self.alive.clone(),
                )))
            }
            TrackKind::Other => Err(PlayerError::DecoderError(format!(
                "不支持的轨道: {}",
                track.mime
            ))),
        }
    }
}

// ==================== Mock 音频设备 ====================

#[derive(Default)]
pub struct SinkProbe {
    pub playing: AtomicBool,
    pub starts: AtomicUsize,
    pub pauses: AtomicUsize,
    pub stops: AtomicUsize,
    pub writes: AtomicUsize,
    pub bytes_written: AtomicUsize,
    pub last_config: Mutex<Option<AudioSinkConfig>>,
}

pub struct MockAudioSink {
    probe: Arc<SinkProbe>,
    alive: Arc<AtomicUsize>,
}

impl Drop for MockAudioSink {
    fn drop(&mut self) {
        self.alive.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AudioSink for MockAudioSink {
    fn start(&mut self) -> Result<()> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        self.probe.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) {
        self.probe.pauses.fetch_add(1, Ordering::SeqCst);
        self.probe.playing.store(false, Ordering::SeqCst);
    }

    fn stop(&mut self) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        self.probe.playing.store(false, Ordering::SeqCst);
    }

    fn write(&mut self, samples: &[u8]) -> usize {
        self.probe.writes.fetch_add(1, Ordering::SeqCst);
        self.probe
            .bytes_written
            .fetch_add(samples.len(), Ordering::SeqCst);
        samples.len()
    }

    fn is_playing(&self) -> bool {
        self.probe.playing.load(Ordering::SeqCst)
    }
}

pub struct MockSinkProvider {
    probe: Arc<SinkProbe>,
    alive: Arc<AtomicUsize>,
}

impl MockSinkProvider {
    pub fn new(alive: Arc<AtomicUsize>) -> Self {
        Self {
            probe: Arc::new(SinkProbe::default()),
            alive,
        }
    }

    pub fn probe(&self) -> Arc<SinkProbe> {
        self.probe.clone()
    }
}

impl AudioSinkProvider for MockSinkProvider {
    fn open(&self, config: &AudioSinkConfig) -> Result<Box<dyn AudioSink>> {
        *self.probe.last_config.lock().unwrap() = Some(*config);
        self.alive.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockAudioSink {
            probe: self.probe.clone(),
            alive: self.alive.clone(),
        }))
    }
}

// ==================== 渲染目标 ====================

pub struct NullSurface;

impl RenderTarget for NullSurface {}

// ==================== 组装 ====================

/// 存活资源计数（提取器 / 解码器 / 音频设备）
#[derive(Clone, Default)]
pub struct Resources {
    pub extractors: Arc<AtomicUsize>,
    pub decoders: Arc<AtomicUsize>,
    pub sinks: Arc<AtomicUsize>,
}

impl Resources {
    pub fn total_alive(&self) -> usize {
        self.extractors.load(Ordering::SeqCst)
            + self.decoders.load(Ordering::SeqCst)
            + self.sinks.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub resources: Resources,
    pub seek_log: Arc<Mutex<Vec<SeekRecord>>>,
    pub audio_probe: Arc<DecoderProbe>,
    pub video_probe: Arc<DecoderProbe>,
    pub sink_probe: Arc<SinkProbe>,
    pub video_got_target: bool,
}

impl Harness {
    /// 某一轨提取器记录到的 seek 目标序列
    pub fn seek_targets(&self, track: usize) -> Vec<i64> {
        self.seek_log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.track == track)
            .map(|r| r.time_us)
            .collect()
    }
}

pub fn extractor_supplier(
    source: MockSource,
    seek_log: Arc<Mutex<Vec<SeekRecord>>>,
    alive: Arc<AtomicUsize>,
) -> ExtractorSupplier {
    let source = Arc::new(source);
    Box::new(move || {
        Ok(Box::new(MockExtractor::new(
            source.clone(),
            seek_log.clone(),
            alive.clone(),
        )))
    })
}

pub fn build_pipeline(
    source: MockSource,
    audio_script: Vec<ScriptedOutput>,
    video_script: Vec<ScriptedOutput>,
) -> (PlaybackPipeline, Harness) {
    try_build_pipeline(source, audio_script, video_script).expect("流水线构建失败")
}

pub fn try_build_pipeline(
    source: MockSource,
    audio_script: Vec<ScriptedOutput>,
    video_script: Vec<ScriptedOutput>,
) -> Result<(PlaybackPipeline, Harness)> {
    init_logger();

    let resources = Resources::default();
    let seek_log = Arc::new(Mutex::new(Vec::new()));

    let supplier = extractor_supplier(source, seek_log.clone(), resources.extractors.clone());
    let decoder_provider =
        MockDecoderProvider::new(audio_script, video_script, resources.decoders.clone());
    let sink_provider = MockSinkProvider::new(resources.sinks.clone());

    let pipeline = PlaybackPipeline::new(
        supplier,
        &decoder_provider,
        &sink_provider,
        Arc::new(NullSurface),
    )?;

    let harness = Harness {
        resources,
        seek_log,
        audio_probe: decoder_provider.audio_probe(),
        video_probe: decoder_provider.video_probe(),
        sink_probe: sink_provider.probe(),
        video_got_target: decoder_provider.video_got_target(),
    };
    Ok((pipeline, harness))
}
