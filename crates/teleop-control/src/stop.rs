use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 一次性停止标志
///
/// 克隆共享同一个标志；一旦 `stop()`，不可复位。
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    stopped: Arc<AtomicBool>,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
