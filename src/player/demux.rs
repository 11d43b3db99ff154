use crate::core::Result;
use crate::player::stream::{PipelineShared, StreamState};
use log::debug;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// 无进展时的退避间隔
pub(crate) const RETRY_DELAY: Duration = Duration::from_millis(10);

/// 单次喂入的结果
enum Feed {
    /// 成功送入一个压缩样本
    Fed,
    /// 解码器暂时没有空闲输入槽位
    NoSlot,
    /// 提取器读完，已提交结束标记
    EndOfStream,
}

/// 调度一次音频解封装（Demux Actor）
pub(crate) fn post_extract_audio(shared: &Arc<PipelineShared>, delay: Duration) {
    let ctx = shared.clone();
    shared
        .actors
        .demux
        .post_delayed(move || extract_audio(ctx), delay);
}

/// 调度一次视频解封装（Demux Actor）
pub(crate) fn post_extract_video(shared: &Arc<PipelineShared>, delay: Duration) {
    let ctx = shared.clone();
    shared
        .actors
        .demux
        .post_delayed(move || extract_video(ctx), delay);
}

fn extract_audio(shared: Arc<PipelineShared>) {
    if shared.audio.input_exhausted.load(Ordering::SeqCst) || shared.has_failed() {
        return;
    }
    match feed_one(&shared, &shared.audio) {
        // 有空闲槽位就立即继续灌，没有就退避
        Ok(Feed::Fed) => post_extract_audio(&shared, Duration::ZERO),
        Ok(Feed::NoSlot) => post_extract_audio(&shared, RETRY_DELAY),
        Ok(Feed::EndOfStream) => debug!("🔊 音频输入结束"),
        Err(e) => shared.report_fatal(e),
    }
}

fn extract_video(shared: Arc<PipelineShared>) {
    if shared.video.input_exhausted.load(Ordering::SeqCst) || shared.has_failed() {
        return;
    }
    match feed_one(&shared, &shared.video) {
        Ok(Feed::Fed) => post_extract_video(&shared, Duration::ZERO),
        Ok(Feed::NoSlot) => post_extract_video(&shared, RETRY_DELAY),
        Ok(Feed::EndOfStream) => debug!("🎬 视频输入结束"),
        Err(e) => shared.report_fatal(e),
    }
}

/// 从提取器读一个压缩样本填进解码器输入槽位
fn feed_one(shared: &Arc<PipelineShared>, stream: &StreamState) -> Result<Feed> {
    let mut decoder = stream.decoder.lock();

    let slot = match decoder.dequeue_input()? {
        Some(slot) => slot,
        None => return Ok(Feed::NoSlot),
    };

    let mut extractor = stream.extractor.lock();
    let size = {
        let buf = decoder.input_buffer(slot);
        extractor.read_sample(buf)?
    };

    match size {
        None => {
            // 没有更多样本：提交结束标记，本流解封装到此为止
            decoder.queue_input(slot, 0, -1, true)?;
            stream.input_exhausted.store(true, Ordering::SeqCst);
            Ok(Feed::EndOfStream)
        }
        Some(size) => {
            let pts_us = extractor.sample_time_us();
            decoder.queue_input(slot, size, pts_us, false)?;
            extractor.advance();
            shared.stats.demuxed.fetch_add(1, Ordering::Relaxed);
            Ok(Feed::Fed)
        }
    }
}
