use crate::core::{Result, TrackInfo};
use std::sync::Arc;

/// 解码器一次 dequeue_output 的结果
///
/// 枚举内的都是契约内信号：`TryAgainLater` / `OutputFormatChanged` /
/// `OutputBuffersChanged` 属于瞬态，退避后重试即可（本设计假定输出
/// 格式固定，后两者无需额外处理）。契约外的异常状态由实现通过
/// `Err` 返回，属于致命缺陷，流水线不得继续。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderEvent {
    /// 有一个解码完成的输出缓冲区
    OutputAvailable {
        buffer_id: usize,
        pts_us: i64,
        end_of_stream: bool,
    },
    /// 暂时没有输出就绪
    TryAgainLater,
    /// 输出格式变化通知
    OutputFormatChanged,
    /// 输出缓冲区集合变化通知
    OutputBuffersChanged,
}

/// 解码器能力 - 异步输入/输出队列的黑盒编解码器
///
/// 输入侧：`dequeue_input` 借一个空闲槽位，填入压缩数据后
/// `queue_input` 提交（`end_of_stream=true` 表示最后一次输入）。
/// 输出侧：`dequeue_output` 轮询完成的缓冲区，用完必须
/// `release_output` 恰好一次归还；`render=true` 时同时提交到
/// 构造时关联的渲染目标显示。
///
/// 约定：`flush` 会作废所有在途缓冲区 id，此后对这些 id 的
/// `release_output` 必须按无操作处理（restart 路径依赖这一点）。
pub trait MediaDecoder: Send {
    /// 启动解码；对已启动的解码器重复调用应为无操作
    fn start(&mut self) -> Result<()>;

    fn stop(&mut self);

    /// 丢弃所有在途的输入/输出缓冲区
    fn flush(&mut self);

    /// 借一个空闲输入槽位；没有空闲时返回 None
    fn dequeue_input(&mut self) -> Result<Option<usize>>;

    /// 槽位对应的输入缓冲区（供提取器写入）
    fn input_buffer(&mut self, slot: usize) -> &mut Vec<u8>;

    /// 提交槽位：前 size 字节有效；end_of_stream 标记最终输入
    fn queue_input(&mut self, slot: usize, size: usize, pts_us: i64, end_of_stream: bool)
        -> Result<()>;

    /// 轮询一个完成的输出；契约外的解码器状态以 Err 返回
    fn dequeue_output(&mut self) -> Result<DecoderEvent>;

    /// 输出缓冲区的有效数据（音频路径拷贝用）
    fn output_buffer(&self, buffer_id: usize) -> &[u8];

    /// 归还输出缓冲区；render=true 时提交到渲染目标显示
    fn release_output(&mut self, buffer_id: usize, render: bool);
}

/// 不透明渲染目标句柄
///
/// 核心从不读写其内容，只在创建视频解码器时透传，由解码器在
/// `release_output(render=true)` 时向它提交画面。
pub trait RenderTarget: Send + Sync {}

/// 解码器工厂 - 按轨道格式创建解码器，视频轨道附带渲染目标
pub trait DecoderProvider: Send + Sync {
    fn create_decoder(
        &self,
        track: &TrackInfo,
        target: Option<Arc<dyn RenderTarget>>,
    ) -> Result<Box<dyn MediaDecoder>>;
}
