//! 会话编排
//!
//! 1. 连接并准备模拟器：确认连接 → 重置 → 启用 API 控制 → 解锁 → 稳定等待
//! 2. 启动遥测线程与控制线程（二者共享模拟器和 `LogSink`）
//! 3. 控制线程结束后通知遥测线程停止（不等待其退出）
//!
//! 连接阶段按 [`RetryPolicy`] 有限重试；会话开始后的指令失败不重试。

use crate::bindings::{KeyBindings, KeySource, run_bindings};
use crate::dispatcher::{Dispatcher, ErrorPolicy};
use crate::error::SessionError;
use crate::heading::Heading;
use crate::log_sink::LogSink;
use crate::metrics::DispatchSnapshot;
use crate::stop::StopFlag;
use crate::telemetry::{DEFAULT_TELEMETRY_PERIOD, TelemetryLogger};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use teleop_sim::{DEFAULT_TAKEOFF_TIMEOUT, SimError, Simulator};
use tracing::{debug, info};

/// 解锁后的稳定等待
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(500);

/// 连接阶段的重试策略（线性退避）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 总尝试次数（至少 1）
    pub attempts: u32,
    /// 第 n 次失败后等待 `backoff * n`
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// 只尝试一次
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        self.backoff.saturating_mul(failed_attempt)
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub settle: Duration,
    pub telemetry_period: Duration,
    pub retry: RetryPolicy,
    pub error_policy: ErrorPolicy,
    /// 起飞指令交给模拟器的超时
    pub takeoff_timeout: Duration,
    pub bindings: KeyBindings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
            telemetry_period: DEFAULT_TELEMETRY_PERIOD,
            retry: RetryPolicy::default(),
            error_policy: ErrorPolicy::default(),
            takeoff_timeout: DEFAULT_TAKEOFF_TIMEOUT,
            bindings: KeyBindings::default(),
        }
    }
}

/// 会话结束时的汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionReport {
    pub dispatch: DispatchSnapshot,
    pub final_heading: Heading,
}

/// 准备模拟器：确认连接 → 重置 → 启用 API 控制 → 解锁
pub fn prepare(sim: &dyn Simulator) -> Result<(), SimError> {
    sim.confirm_connection()?;
    sim.reset()?;
    sim.enable_api_control(true)?;
    if !sim.arm_disarm(true)? {
        return Err(SimError::NotReady("arming refused".to_string()));
    }
    Ok(())
}

/// 连接并准备模拟器，失败时按重试策略重新连接
///
/// `connect` 每次尝试调用一次，返回新的模拟器连接。
pub fn establish<F>(
    mut connect: F,
    config: &SessionConfig,
    sink: &LogSink,
) -> Result<Arc<dyn Simulator>, SessionError>
where
    F: FnMut() -> Result<Arc<dyn Simulator>, SimError>,
{
    let attempts = config.retry.attempts.max(1);
    let mut last_error = SimError::Disconnected;

    for attempt in 1..=attempts {
        debug!("Connection attempt {}/{}", attempt, attempts);
        match connect().and_then(|sim| prepare(sim.as_ref()).map(|()| sim)) {
            Ok(sim) => {
                thread::sleep(config.settle);
                sink.info("Connected to instance of AirSim, simulation ready to start...");
                return Ok(sim);
            },
            Err(e) => {
                sink.warn(format_args!(
                    "Connection attempt {}/{} failed: {}",
                    attempt, attempts, e
                ));
                last_error = e;
                if attempt < attempts {
                    thread::sleep(config.retry.delay_after(attempt));
                }
            },
        }
    }

    Err(SessionError::Connect {
        attempts,
        source: last_error,
    })
}

/// 一次遥控会话
pub struct Session {
    sim: Arc<dyn Simulator>,
    sink: LogSink,
    config: SessionConfig,
    stop: StopFlag,
}

impl Session {
    /// `sim` 应已通过 [`establish`] 或 [`prepare`] 准备好
    pub fn new(sim: Arc<dyn Simulator>, sink: LogSink, config: SessionConfig) -> Self {
        Self {
            sim,
            sink,
            config,
            stop: StopFlag::new(),
        }
    }

    /// 控制循环的停止标志（信号处理用）
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// 运行到退出键、输入关闭或停止标志被设置
    pub fn run<K>(self, keys: K) -> Result<SessionReport, SessionError>
    where
        K: KeySource + Send + 'static,
    {
        let Session {
            sim,
            sink,
            config,
            stop,
        } = self;

        let logger =
            TelemetryLogger::new(sim.clone(), sink.clone()).with_period(config.telemetry_period);
        let telemetry_stop = logger.stop_flag();
        let mut dispatcher = Dispatcher::new(sim, sink.clone())
            .with_policy(config.error_policy)
            .with_takeoff_timeout(config.takeoff_timeout);
        let bindings = config.bindings;

        // 遥测线程不 join，句柄直接丢弃
        let _ = logger
            .spawn()
            .map_err(|e| SessionError::Spawn("telemetry", e))?;

        let control = thread::Builder::new()
            .name("control".into())
            .spawn(move || {
                let mut keys = keys;
                run_bindings(&mut dispatcher, &mut keys, &bindings, &stop)?;
                Ok::<_, SessionError>(SessionReport {
                    dispatch: dispatcher.metrics().snapshot(),
                    final_heading: dispatcher.heading(),
                })
            });

        let control = match control {
            Ok(handle) => handle,
            Err(e) => {
                telemetry_stop.stop();
                return Err(SessionError::Spawn("control", e));
            },
        };

        let result = control.join();
        telemetry_stop.stop();

        match result {
            Ok(Ok(report)) => {
                info!(
                    "Session finished: {} issued, {} rejected, {} failed, heading {}",
                    report.dispatch.issued,
                    report.dispatch.rejected,
                    report.dispatch.propagated,
                    report.final_heading
                );
                sink.info("Session finished");
                Ok(report)
            },
            Ok(Err(e)) => {
                sink.error(format_args!("Session aborted: {}", e));
                Err(e)
            },
            Err(_) => {
                sink.error("Control thread panicked");
                Err(SessionError::Panicked("control"))
            },
        }
    }
}
