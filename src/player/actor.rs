use log::debug;
use parking_lot::{Condvar, Mutex};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Actor - 独占一个工作线程的有序任务队列
///
/// 每个 Actor 串行执行任务，通过 post/post_delayed/post_at 自我调度，
/// 不在任务内阻塞等待其他 Actor（暂停/释放集合点除外）。
/// `post_front` 用于生命周期控制任务插队到队首。
pub struct Actor {
    inner: Arc<ActorInner>,
    thread: Option<thread::JoinHandle<()>>,
}

/// Actor 的发送句柄，可跨线程克隆
#[derive(Clone)]
pub struct ActorHandle {
    inner: Arc<ActorInner>,
}

struct ActorInner {
    name: &'static str,
    state: Mutex<QueueState>,
    available: Condvar,
}

struct QueueState {
    front: VecDeque<Task>,          // 插队任务，优先于一切定时任务
    timed: BinaryHeap<TimedTask>,   // 按 (到期时刻, 提交顺序) 排序
    next_seq: u64,
    quit: bool,
}

struct TimedTask {
    due: Instant,
    seq: u64,
    task: Task,
}

// BinaryHeap 是大顶堆，这里反转比较得到"最早到期先出"
impl Ord for TimedTask {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimedTask {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimedTask {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for TimedTask {}

impl Actor {
    /// 启动一个命名的 Actor 工作线程
    pub fn spawn(name: &'static str) -> Self {
        let inner = Arc::new(ActorInner {
            name,
            state: Mutex::new(QueueState {
                front: VecDeque::new(),
                timed: BinaryHeap::new(),
                next_seq: 0,
                quit: false,
            }),
            available: Condvar::new(),
        });

        let worker = inner.clone();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_loop(worker))
            .unwrap_or_else(|e| panic!("无法启动 Actor 线程 {name}: {e}"));

        Self {
            inner,
            thread: Some(thread),
        }
    }

    pub fn handle(&self) -> ActorHandle {
        ActorHandle {
            inner: self.inner.clone(),
        }
    }

    /// 等待工作线程结束（须先通过句柄 quit）
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            debug!("Actor [{}] 线程已结束", self.inner.name);
        }
    }
}

impl Drop for Actor {
    fn drop(&mut self) {
        // 未经 release 直接丢弃时兜底退出，避免线程泄漏
        self.handle().quit();
        self.join();
    }
}

fn run_loop(inner: Arc<ActorInner>) {
    debug!("Actor [{}] 启动", inner.name);
    loop {
        let task = {
            let mut q = inner.state.lock();
            loop {
                if q.quit {
                    // 退出时丢弃全部剩余任务
                    q.front.clear();
                    q.timed.clear();
                    debug!("Actor [{}] 退出", inner.name);
                    return;
                }
                if let Some(task) = q.front.pop_front() {
                    break task;
                }
                let now = Instant::now();
                match q.timed.peek() {
                    Some(head) if head.due <= now => {
                        break q.timed.pop().expect("peek 保证非空").task;
                    }
                    Some(head) => {
                        let due = head.due;
                        let _ = inner.available.wait_until(&mut q, due);
                    }
                    None => inner.available.wait(&mut q),
                }
            }
        };
        task();
    }
}

impl ActorHandle {
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// 立即排队执行
    pub fn post<F: FnOnce() + Send + 'static>(&self, task: F) {
        self.post_at(task, Instant::now());
    }

    /// 延迟执行（退避重试用）
    pub fn post_delayed<F: FnOnce() + Send + 'static>(&self, task: F, delay: Duration) {
        self.post_at(task, Instant::now() + delay);
    }

    /// 在指定的绝对时刻执行（渲染 deadline 用）
    pub fn post_at<F: FnOnce() + Send + 'static>(&self, task: F, due: Instant) {
        let mut q = self.inner.state.lock();
        if q.quit {
            return;
        }
        let seq = q.next_seq;
        q.next_seq += 1;
        q.timed.push(TimedTask {
            due,
            seq,
            task: Box::new(task),
        });
        self.inner.available.notify_one();
    }

    /// 插到队首，优先于所有已排队任务（生命周期控制专用）
    pub fn post_front<F: FnOnce() + Send + 'static>(&self, task: F) {
        let mut q = self.inner.state.lock();
        if q.quit {
            return;
        }
        q.front.push_back(Box::new(task));
        self.inner.available.notify_one();
    }

    /// 丢弃所有排队中的任务（不影响正在执行的任务）
    pub fn clear_pending(&self) {
        let mut q = self.inner.state.lock();
        let dropped = q.front.len() + q.timed.len();
        q.front.clear();
        q.timed.clear();
        if dropped > 0 {
            debug!("Actor [{}] 丢弃 {} 个排队任务", self.inner.name, dropped);
        }
    }

    /// 结束工作线程：当前任务执行完后退出，剩余任务丢弃
    pub fn quit(&self) {
        let mut q = self.inner.state.lock();
        q.quit = true;
        self.inner.available.notify_one();
    }
}
