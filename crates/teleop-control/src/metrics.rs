//! 分发计数器
//!
//! 原子计数，控制线程写入，其他线程通过 `snapshot()` 读取。

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// 已被模拟器接受的指令
    pub issued: AtomicU64,
    /// 失败但按 BestEffort 策略吞掉的速度指令
    pub rejected: AtomicU64,
    /// 失败并返回给调用方的指令
    pub propagated: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            issued: self.issued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            propagated: self.propagated.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSnapshot {
    pub issued: u64,
    pub rejected: u64,
    pub propagated: u64,
}

impl DispatchSnapshot {
    pub fn total(&self) -> u64 {
        self.issued + self.rejected + self.propagated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = DispatchMetrics::new();
        metrics.issued.fetch_add(3, Ordering::Relaxed);
        metrics.rejected.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.issued, 3);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.propagated, 0);
        assert_eq!(snapshot.total(), 4);
    }
}
