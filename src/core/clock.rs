use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 同步时钟 - 音视频共享的播放起点
///
/// `epoch` 是"显示时间戳 0"对应的墙钟时刻，每个 play/seek 周期由
/// 同步器写入一次；未建立时为 `None`，此时不得用它推导渲染时刻。
#[derive(Clone)]
pub struct SyncClock {
    epoch: Arc<Mutex<Option<Instant>>>,
}

impl SyncClock {
    pub fn new() -> Self {
        Self {
            epoch: Arc::new(Mutex::new(None)),
        }
    }

    /// 以两路首帧中较早的 PTS 建立时钟：`epoch = now - start_pts`
    ///
    /// 只在未建立时生效，返回实际使用的 epoch。
    pub fn establish(&self, now: Instant, start_pts_us: i64) -> Instant {
        let mut guard = self.epoch.lock();
        if let Some(epoch) = *guard {
            return epoch;
        }
        let epoch = shift(now, -start_pts_us);
        *guard = Some(epoch);
        epoch
    }

    pub fn is_established(&self) -> bool {
        self.epoch.lock().is_some()
    }

    pub fn epoch(&self) -> Option<Instant> {
        *self.epoch.lock()
    }

    /// 某一帧的绝对渲染时刻：`epoch + pts`；时钟未建立时为 None
    pub fn deadline_for(&self, pts_us: i64) -> Option<Instant> {
        self.epoch.lock().map(|epoch| shift(epoch, pts_us))
    }

    /// 当前播放位置（时钟未建立时为 None）
    pub fn position(&self) -> Option<Duration> {
        self.epoch
            .lock()
            .map(|epoch| Instant::now().saturating_duration_since(epoch))
    }

    /// 回到未建立状态（play/seek/restart 时调用）
    pub fn reset(&self) {
        *self.epoch.lock() = None;
    }
}

impl Default for SyncClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Instant 偏移微秒数（可负）
fn shift(base: Instant, offset_us: i64) -> Instant {
    if offset_us >= 0 {
        base + Duration::from_micros(offset_us as u64)
    } else {
        base.checked_sub(Duration::from_micros(offset_us.unsigned_abs()))
            .unwrap_or(base)
    }
}
