//! One-shot 模式
//!
//! 每个命令独立执行：
//! 1. 打开日志文件（覆盖）
//! 2. 连接并准备模拟器
//! 3. 执行操作
//! 4. 断开连接（drop）

use anyhow::{Context, Result};
use std::sync::Arc;
use teleop_control::log_sink::WorkerGuard;
use teleop_control::sim::{AirSimClient, MockSimulator, Simulator};
use teleop_control::{Dispatcher, LogSink, SessionConfig, establish};

use crate::config::{Backend, CliConfig};

/// 打开会话日志，并设为全局默认（模拟器层的 tracing 事件写入同一文件）
pub fn open_log(config: &CliConfig) -> Result<(LogSink, WorkerGuard)> {
    let (sink, guard) = LogSink::file(&config.log.file, &config.log.source)
        .with_context(|| format!("无法创建日志文件: {}", config.log.file.display()))?;
    tracing::dispatcher::set_global_default(sink.dispatch().clone())
        .context("设置全局日志失败")?;
    Ok((sink, guard))
}

pub fn describe_backend(config: &CliConfig) -> String {
    match config.simulator.backend {
        Backend::Airsim => format!("AirSim {}:{}", config.simulator.host, config.simulator.port),
        Backend::Mock => "mock".to_string(),
    }
}

/// 按配置的后端建立连接（含重试）
pub fn connect_backend(
    config: &CliConfig,
    session: &SessionConfig,
    sink: &LogSink,
) -> Result<Arc<dyn Simulator>> {
    let sim = match config.simulator.backend {
        Backend::Airsim => {
            let airsim = config.airsim();
            establish(
                || AirSimClient::connect(&airsim).map(|c| Arc::new(c) as Arc<dyn Simulator>),
                session,
                sink,
            )?
        },
        Backend::Mock => establish(
            || Ok(Arc::new(MockSimulator::new()) as Arc<dyn Simulator>),
            session,
            sink,
        )?,
    };
    Ok(sim)
}

/// 已连接的一次性会话
pub struct OneShotMode {
    sim: Arc<dyn Simulator>,
    sink: LogSink,
    session: SessionConfig,
    // 最后 drop：刷新日志
    _guard: WorkerGuard,
}

impl OneShotMode {
    pub fn connect(config: &CliConfig) -> Result<Self> {
        let session = config.session()?;
        let (sink, guard) = open_log(config)?;

        println!("⏳ 连接到模拟器（{}）...", describe_backend(config));
        let sim = connect_backend(config, &session, &sink)?;
        println!("✅ 已连接");

        Ok(Self {
            sim,
            sink,
            session,
            _guard: guard,
        })
    }

    /// 按会话配置（错误策略、起飞超时）构造分发器
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.sim.clone(), self.sink.clone())
            .with_policy(self.session.error_policy)
            .with_takeoff_timeout(self.session.takeoff_timeout)
    }
}
