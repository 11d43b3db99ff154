use crate::player::demux::RETRY_DELAY;
use crate::player::render::{post_render_audio, post_render_video};
use crate::player::stream::PipelineShared;
use log::debug;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 调度一次同步检查（Sync Actor）
///
/// 每当任一路解码出新帧就会被触发；两个队列都空时直接返回，
/// 由下一次入队重新唤起。
pub(crate) fn post_sync(shared: &Arc<PipelineShared>, delay: Duration) {
    let ctx = shared.clone();
    shared.actors.sync.post_delayed(move || sync_step(ctx), delay);
}

/// 同步器核心：建立时钟、计算渲染时刻、分发队首帧
fn sync_step(shared: Arc<PipelineShared>) {
    if shared.has_failed() {
        return;
    }

    let now = Instant::now();
    let audio_pts = shared.audio_frames.head_pts();
    let video_pts = shared.video_frames.head_pts();

    if audio_pts.is_none() && video_pts.is_none() {
        return;
    }

    // ========== 建立播放起点 ==========
    // 两路首帧都到齐才建立 epoch，取较早的 PTS 作为显示时间 0。
    // 只有一路到达时先等待，防止单路抢跑在共享时钟存在之前。
    if !shared.clock.is_established() {
        let (Some(audio), Some(video)) = (audio_pts, video_pts) else {
            return;
        };
        let start_pts = audio.min(video);
        shared.clock.establish(now, start_pts);
        debug!(
            "⏱️  建立时钟: 起始 PTS={}us (音频首帧={}us, 视频首帧={}us)",
            start_pts, audio, video
        );
    }

    // ========== 分发音频队首 ==========
    // 音频迟到也照常渲染（丢音频会产生可闻的毛刺），最多晚一点
    if audio_pts.is_some() {
        if let Some(frame) = shared.audio_frames.pop() {
            let Some(deadline) = shared.clock.deadline_for(frame.pts_us) else {
                return;
            };
            post_render_audio(&shared, frame, deadline);
        }
    }

    // ========== 分发视频队首 ==========
    // 渲染时刻已过的视频帧直接丢弃，让视频追上时钟而不是越拖越远
    if video_pts.is_some() {
        if let Some(frame) = shared.video_frames.pop() {
            let Some(deadline) = shared.clock.deadline_for(frame.pts_us) else {
                return;
            };
            if deadline > now {
                post_render_video(&shared, frame, deadline);
            } else {
                debug!("🗑️  丢弃迟到视频帧: PTS={}us", frame.pts_us);
                shared
                    .video
                    .decoder
                    .lock()
                    .release_output(frame.buffer_id, false);
                shared.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    // 还有积压就立即再来一轮，否则退避轮询
    if !shared.audio_frames.is_empty() || !shared.video_frames.is_empty() {
        post_sync(&shared, Duration::ZERO);
    } else {
        post_sync(&shared, RETRY_DELAY);
    }
}
