use crate::core::{AudioFrame, VideoFrame};
use crate::player::decoder::DecoderEvent;
use crate::player::demux::RETRY_DELAY;
use crate::player::stream::PipelineShared;
use crate::player::sync::post_sync;
use log::debug;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// 调度一次音频解码输出排空（Audio-Decode Actor）
pub(crate) fn post_decode_audio(shared: &Arc<PipelineShared>, delay: Duration) {
    let ctx = shared.clone();
    shared
        .actors
        .audio_decode
        .post_delayed(move || decode_audio(ctx), delay);
}

/// 调度一次视频解码输出排空（Video-Decode Actor）
pub(crate) fn post_decode_video(shared: &Arc<PipelineShared>, delay: Duration) {
    let ctx = shared.clone();
    shared
        .actors
        .video_decode
        .post_delayed(move || decode_video(ctx), delay);
}

fn decode_audio(shared: Arc<PipelineShared>) {
    if shared.audio.output_exhausted.load(Ordering::SeqCst) || shared.has_failed() {
        return;
    }

    let event = {
        let mut decoder = shared.audio.decoder.lock();
        match decoder.dequeue_output() {
            Ok(event) => event,
            Err(e) => {
                // 契约外的解码器状态：不得继续，上报后本 Actor 停止
                drop(decoder);
                shared.report_fatal(e);
                return;
            }
        }
    };

    match event {
        DecoderEvent::OutputAvailable {
            buffer_id,
            pts_us,
            end_of_stream,
        } => {
            let mut decoder = shared.audio.decoder.lock();
            if end_of_stream {
                decoder.release_output(buffer_id, false);
                shared.audio.output_exhausted.store(true, Ordering::SeqCst);
                debug!("🔊 音频输出结束");
                return;
            }
            // 音频帧带走输出数据的拷贝，缓冲区 id 留待渲染后归还
            let data = decoder.output_buffer(buffer_id).to_vec();
            drop(decoder);

            shared.audio_frames.push(AudioFrame {
                data,
                buffer_id,
                pts_us,
            });
            shared.stats.decoded.fetch_add(1, Ordering::Relaxed);
            post_sync(&shared, Duration::ZERO);
            post_decode_audio(&shared, Duration::ZERO);
        }
        // 瞬态信号：输出格式固定，变化通知无需处理，统一退避重试
        DecoderEvent::TryAgainLater
        | DecoderEvent::OutputFormatChanged
        | DecoderEvent::OutputBuffersChanged => post_decode_audio(&shared, RETRY_DELAY),
    }
}

fn decode_video(shared: Arc<PipelineShared>) {
    if shared.video.output_exhausted.load(Ordering::SeqCst) || shared.has_failed() {
        return;
    }

    let event = {
        let mut decoder = shared.video.decoder.lock();
        match decoder.dequeue_output() {
            Ok(event) => event,
            Err(e) => {
                drop(decoder);
                shared.report_fatal(e);
                return;
            }
        }
    };

    match event {
        DecoderEvent::OutputAvailable {
            buffer_id,
            pts_us,
            end_of_stream,
        } => {
            if end_of_stream {
                shared.video.decoder.lock().release_output(buffer_id, false);
                shared.video.output_exhausted.store(true, Ordering::SeqCst);
                debug!("🎬 视频输出结束");
                return;
            }
            // 视频帧不拷贝图像数据，只记录缓冲区句柄和时间戳
            shared.video_frames.push(VideoFrame { buffer_id, pts_us });
            shared.stats.decoded.fetch_add(1, Ordering::Relaxed);
            post_sync(&shared, Duration::ZERO);
            post_decode_video(&shared, Duration::ZERO);
        }
        DecoderEvent::TryAgainLater
        | DecoderEvent::OutputFormatChanged
        | DecoderEvent::OutputBuffersChanged => post_decode_video(&shared, RETRY_DELAY),
    }
}
