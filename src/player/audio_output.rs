use crate::core::{AudioSinkConfig, PlayerError, Result, SampleFormat};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig, SupportedStreamConfigRange};
use crossbeam::queue::SegQueue;
use log::{debug, info, warn};
use std::sync::Arc;

/// 音频输出设备能力
///
/// 按采样率/声道/编码配置打开，非阻塞写入原始采样字节。
/// 设备资源随 Drop 释放。
pub trait AudioSink: Send {
    fn start(&mut self) -> Result<()>;

    /// 暂停输出但保留设备（pause() 生命周期用）
    fn pause(&mut self);

    fn stop(&mut self);

    /// 非阻塞写入原始采样，返回接受的字节数
    fn write(&mut self, samples: &[u8]) -> usize;

    fn is_playing(&self) -> bool;
}

/// 音频设备工厂 - 构造时按音频轨道参数打开设备
pub trait AudioSinkProvider: Send + Sync {
    fn open(&self, config: &AudioSinkConfig) -> Result<Box<dyn AudioSink>>;
}

/// 默认音频输出 - 使用 cpal 播放
pub struct CpalAudioOutput {
    device: Device,
    config: StreamConfig,
    encoding: SampleFormat,
    stream: Option<Stream>,
    buffer: Arc<SegQueue<f32>>,
    playing: bool,
}

// cpal::Stream 本身不是 Send，但音频渲染 Actor 独占本输出，
// 创建和使用都在同一个线程中
unsafe impl Send for CpalAudioOutput {}

impl CpalAudioOutput {
    /// 打开默认输出设备（支持非标准配置自动回退）
    pub fn open(sink_config: &AudioSinkConfig) -> Result<Self> {
        info!(
            "初始化音频输出: {} Hz, {} 声道, {:?}",
            sink_config.sample_rate, sink_config.channels, sink_config.format
        );

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlayerError::AudioError("无法找到音频输出设备".to_string()))?;

        debug!("使用音频设备: {}", device.name().unwrap_or_default());

        let mut config = StreamConfig {
            channels: sink_config.channels,
            sample_rate: cpal::SampleRate(sink_config.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        if !Self::device_supports(&device, &config)? {
            warn!(
                "⚠️  音频设备不支持 {} Hz, {} 声道，回退到标准配置",
                sink_config.sample_rate, sink_config.channels
            );

            let fallback_configs = [(48000, 2), (44100, 2), (48000, 1), (44100, 1)];
            let mut found = false;
            for (rate, channels) in fallback_configs {
                let candidate = StreamConfig {
                    channels,
                    sample_rate: cpal::SampleRate(rate),
                    buffer_size: cpal::BufferSize::Default,
                };
                if Self::device_supports(&device, &candidate)? {
                    info!("✅ 使用回退配置: {} Hz, {} 声道", rate, channels);
                    config = candidate;
                    found = true;
                    break;
                }
            }
            if !found {
                return Err(PlayerError::AudioError(format!(
                    "音频设备不支持任何标准配置 (原请求: {} Hz, {} 声道)",
                    sink_config.sample_rate, sink_config.channels
                )));
            }
        }

        Ok(Self {
            device,
            config,
            encoding: sink_config.format,
            stream: None,
            buffer: Arc::new(SegQueue::new()),
            playing: false,
        })
    }

    fn device_supports(device: &Device, config: &StreamConfig) -> Result<bool> {
        let supported = device
            .supported_output_configs()
            .map_err(|e| PlayerError::AudioError(format!("无法获取支持的音频配置: {}", e)))?;
        Ok(supported.into_iter().any(|s| Self::is_config_compatible(config, &s)))
    }

    fn is_config_compatible(config: &StreamConfig, supported: &SupportedStreamConfigRange) -> bool {
        let rate_in_range = config.sample_rate.0 >= supported.min_sample_rate().0
            && config.sample_rate.0 <= supported.max_sample_rate().0;
        rate_in_range && config.channels == supported.channels()
    }

    fn build_stream(&mut self) -> Result<()> {
        let buffer = self.buffer.clone();
        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        *sample = buffer.pop().unwrap_or(0.0);
                    }
                },
                move |err| {
                    warn!("音频流错误: {}", err);
                },
                None,
            )
            .map_err(|e| PlayerError::AudioError(format!("创建音频流失败: {}", e)))?;
        self.stream = Some(stream);
        Ok(())
    }
}

impl AudioSink for CpalAudioOutput {
    fn start(&mut self) -> Result<()> {
        if self.stream.is_none() {
            self.build_stream()?;
            info!("音频输出已启动");
        }
        if let Some(ref stream) = self.stream {
            stream
                .play()
                .map_err(|e| PlayerError::AudioError(format!("启动音频流失败: {}", e)))?;
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(ref stream) = self.stream {
            if let Err(e) = stream.pause() {
                warn!("暂停音频流失败: {}", e);
            }
        }
        self.playing = false;
    }

    fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("音频输出已停止");
        }
        self.playing = false;
        while self.buffer.pop().is_some() {}
    }

    fn write(&mut self, samples: &[u8]) -> usize {
        match self.encoding {
            SampleFormat::F32 => {
                for chunk in samples.chunks_exact(4) {
                    let v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                    self.buffer.push(v);
                }
            }
            SampleFormat::I16 => {
                for chunk in samples.chunks_exact(2) {
                    let v = i16::from_le_bytes([chunk[0], chunk[1]]);
                    self.buffer.push(f32::from(v) / 32768.0);
                }
            }
        }
        samples.len()
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

impl Drop for CpalAudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 默认设备工厂
pub struct CpalSinkProvider;

impl AudioSinkProvider for CpalSinkProvider {
    fn open(&self, config: &AudioSinkConfig) -> Result<Box<dyn AudioSink>> {
        Ok(Box::new(CpalAudioOutput::open(config)?))
    }
}
