use crate::core::{AudioFrame, VideoFrame};
use crate::player::stream::PipelineShared;
use log::{debug, warn};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

/// 在渲染时刻写出音频帧（Audio-Render Actor）
///
/// 确保设备在播放状态，非阻塞写入采样，然后归还解码缓冲区
/// （音频没有显示缓冲，render=false）。
pub(crate) fn post_render_audio(shared: &Arc<PipelineShared>, frame: AudioFrame, at: Instant) {
    let ctx = shared.clone();
    shared.actors.audio_render.post_at(
        move || {
            {
                let mut sink = ctx.audio_sink.lock();
                if !sink.is_playing() {
                    if let Err(e) = sink.start() {
                        warn!("启动音频设备失败: {}", e);
                        ctx.report_fatal(e);
                        return;
                    }
                }
                sink.write(&frame.data);
            }
            debug!("🔊 音频渲染: PTS={}us, buffer={}", frame.pts_us, frame.buffer_id);
            ctx.audio
                .decoder
                .lock()
                .release_output(frame.buffer_id, false);
            ctx.stats.rendered.fetch_add(1, Ordering::Relaxed);
        },
        at,
    );
}

/// 在渲染时刻提交视频帧显示（Video-Render Actor）
///
/// render=true 的归还会把缓冲区交给渲染目标呈现。
pub(crate) fn post_render_video(shared: &Arc<PipelineShared>, frame: VideoFrame, at: Instant) {
    let ctx = shared.clone();
    shared.actors.video_render.post_at(
        move || {
            debug!("🎬 视频渲染: PTS={}us, buffer={}", frame.pts_us, frame.buffer_id);
            ctx.video
                .decoder
                .lock()
                .release_output(frame.buffer_id, true);
            ctx.stats.rendered.fetch_add(1, Ordering::Relaxed);
        },
        at,
    );
}
