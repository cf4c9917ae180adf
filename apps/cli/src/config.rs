//! CLI 配置
//!
//! 默认路径：`<config_dir>/airsim-teleop/config.toml`。文件不存在时使用默认值；
//! 命令行参数覆盖文件中的值。
//!
//! ```toml
//! [simulator]
//! backend = "airsim"
//! host = "127.0.0.1"
//! port = 41451
//!
//! [session]
//! speed = 5.0
//! turn_degrees = 5.0
//! error_policy = "best_effort"
//! takeoff_timeout_ms = 20000
//!
//! [log]
//! file = "log.log"
//!
//! [keys]
//! exit = "esc"
//!
//! [keys.bindings]
//! forward = "i"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use teleop_control::session::DEFAULT_SETTLE;
use teleop_control::sim::{AirSimConfig, DEFAULT_TAKEOFF_TIMEOUT};
use teleop_control::sim::airsim::DEFAULT_PORT;
use teleop_control::telemetry::DEFAULT_TELEMETRY_PERIOD;
use teleop_control::{ActionKind, ErrorPolicy, Key, KeyBindings, Magnitudes, RetryPolicy, SessionConfig};

/// 配置目录
pub fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("airsim-teleop");
    Ok(path)
}

pub fn default_config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// 模拟器后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Airsim,
    /// 进程内模拟器（无需 AirSim）
    Mock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSection {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    pub vehicle_name: String,
    pub connect_timeout_ms: u64,
    /// 同步调用的等待上限；未设置时一直等待
    pub call_timeout_ms: Option<u64>,
}

impl Default for SimulatorSection {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            vehicle_name: String::new(),
            connect_timeout_ms: 5000,
            call_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    #[serde(flatten)]
    pub magnitudes: Magnitudes,
    pub settle_ms: u64,
    pub telemetry_period_ms: u64,
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
    pub error_policy: ErrorPolicy,
    pub takeoff_timeout_ms: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            magnitudes: Magnitudes::default(),
            settle_ms: DEFAULT_SETTLE.as_millis() as u64,
            telemetry_period_ms: DEFAULT_TELEMETRY_PERIOD.as_millis() as u64,
            retry_attempts: retry.attempts,
            retry_backoff_ms: retry.backoff.as_millis() as u64,
            error_policy: ErrorPolicy::default(),
            takeoff_timeout_ms: DEFAULT_TAKEOFF_TIMEOUT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub file: PathBuf,
    /// 每条记录中的来源名
    pub source: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            file: PathBuf::from("log.log"),
            source: teleop_control::log_sink::DEFAULT_SOURCE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysSection {
    pub exit: Option<String>,
    /// 动作名 → 按键名
    pub bindings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub simulator: SimulatorSection,
    pub session: SessionSection,
    pub log: LogSection,
    pub keys: KeysSection,
}

impl CliConfig {
    /// 加载配置；文件不存在时返回默认值
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("解析配置文件失败: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn airsim(&self) -> AirSimConfig {
        AirSimConfig {
            host: self.simulator.host.clone(),
            port: self.simulator.port,
            vehicle_name: self.simulator.vehicle_name.clone(),
            connect_timeout: Duration::from_millis(self.simulator.connect_timeout_ms),
            call_timeout: self.simulator.call_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn bindings(&self) -> Result<KeyBindings> {
        let mut bindings = KeyBindings::default().with_magnitudes(self.session.magnitudes);

        if let Some(exit) = &self.keys.exit {
            let key: Key = exit.parse()?;
            bindings.set_exit_key(key)?;
        }
        for (action, key) in &self.keys.bindings {
            let kind: ActionKind = action.parse()?;
            let key: Key = key.parse()?;
            bindings
                .bind(key, kind)
                .with_context(|| format!("无法绑定 {} → {}", key, kind))?;
        }
        Ok(bindings)
    }

    pub fn session(&self) -> Result<SessionConfig> {
        let s = &self.session;
        Ok(SessionConfig {
            settle: Duration::from_millis(s.settle_ms),
            telemetry_period: Duration::from_millis(s.telemetry_period_ms),
            retry: RetryPolicy {
                attempts: s.retry_attempts,
                backoff: Duration::from_millis(s.retry_backoff_ms),
            },
            error_policy: s.error_policy,
            takeoff_timeout: Duration::from_millis(s.takeoff_timeout_ms),
            bindings: self.bindings()?,
        })
    }
}
