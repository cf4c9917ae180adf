//! 遥测记录
//!
//! 周期性查询多旋翼状态与碰撞信息，并以多行记录写入共享 `LogSink`：
//!
//! ```text
//! ... - INFO - State:
//! MultirotorState { ... }
//! ... - INFO - Collision:
//! CollisionInfo { ... }
//! ```
//!
//! 查询失败记录警告后继续下一周期；只有停止标志能结束循环。

use crate::log_sink::LogSink;
use crate::stop::StopFlag;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use teleop_sim::{SimError, Simulator};
use tracing::debug;

/// 默认查询周期
pub const DEFAULT_TELEMETRY_PERIOD: Duration = Duration::from_secs(1);

/// 遥测循环结束时的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TelemetryStats {
    /// 成功记录的周期数（每个周期一条 State 和一条 Collision）
    pub ticks: u64,
    /// 查询失败的周期数
    pub failures: u64,
}

pub struct TelemetryLogger {
    sim: Arc<dyn Simulator>,
    sink: LogSink,
    period: Duration,
    stop: StopFlag,
}

impl TelemetryLogger {
    pub fn new(sim: Arc<dyn Simulator>, sink: LogSink) -> Self {
        Self {
            sim,
            sink,
            period: DEFAULT_TELEMETRY_PERIOD,
            stop: StopFlag::new(),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 停止标志（可在 `run` / `spawn` 之前克隆出来）
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// 查询一次并写入两条记录
    pub fn tick(&self) -> Result<(), SimError> {
        let state = self.sim.multirotor_state()?;
        let collision = self.sim.collision_info()?;

        self.sink.info(format_args!("State:\n{:#?}", state));
        self.sink.info(format_args!("Collision:\n{:#?}", collision));
        Ok(())
    }

    /// 阻塞运行直到停止标志被设置
    ///
    /// 停止标志在每次查询前检查，因此停止后最多再睡眠一个周期。
    pub fn run(self) -> TelemetryStats {
        let mut stats = TelemetryStats::default();

        while !self.stop.is_stopped() {
            match self.tick() {
                Ok(()) => stats.ticks += 1,
                Err(e) => {
                    stats.failures += 1;
                    self.sink.warn(format_args!("Telemetry query failed: {}", e));
                },
            }
            thread::sleep(self.period);
        }

        debug!(
            "Telemetry loop stopped after {} ticks ({} failures)",
            stats.ticks, stats.failures
        );
        stats
    }

    /// 在后台线程中运行
    pub fn spawn(self) -> io::Result<JoinHandle<TelemetryStats>> {
        thread::Builder::new()
            .name("telemetry".into())
            .spawn(move || self.run())
    }
}
