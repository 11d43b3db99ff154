use crate::core::{Result, SeekMode, TrackInfo, TrackKind};

/// 提取器能力 - 把容器拆成按轨道的压缩样本序列
///
/// 由外部协作方提供（核心不关心容器格式），资源随 Drop 释放。
/// 读取游标语义：`read_sample` 读当前样本，`advance` 前进到下一个，
/// `sample_time_us` 是当前样本的显示时间戳。
pub trait MediaExtractor: Send {
    fn track_count(&self) -> usize;

    fn track_info(&self, index: usize) -> TrackInfo;

    /// 选择后续读取的轨道
    fn select_track(&mut self, index: usize);

    /// 把当前压缩样本读入调用方缓冲区，返回字节数；流结束返回 None
    fn read_sample(&mut self, buf: &mut Vec<u8>) -> Result<Option<usize>>;

    /// 当前样本的显示时间戳（微秒）
    fn sample_time_us(&self) -> i64;

    /// 前进到下一个样本，没有更多样本时返回 false
    fn advance(&mut self) -> bool;

    /// 按关键帧对齐方式跳到指定时间戳（微秒）
    fn seek_to(&mut self, time_us: i64, mode: SeekMode);
}

/// 第一条指定类型的轨道下标
pub fn find_first_track(extractor: &dyn MediaExtractor, kind: TrackKind) -> Option<usize> {
    (0..extractor.track_count()).find(|&i| extractor.track_info(i).kind() == kind)
}

pub fn first_audio_track(extractor: &dyn MediaExtractor) -> Option<usize> {
    find_first_track(extractor, TrackKind::Audio)
}

pub fn first_video_track(extractor: &dyn MediaExtractor) -> Option<usize> {
    find_first_track(extractor, TrackKind::Video)
}

/// 提取器工厂：每条流各开一个独立的提取器游标
pub type ExtractorSupplier = Box<dyn Fn() -> Result<Box<dyn MediaExtractor>> + Send>;
