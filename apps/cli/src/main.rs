//! # Teleop CLI
//!
//! 用键盘遥控 AirSim 中的多旋翼，同时把遥测写入日志文件。
//!
//! ## 交互模式（默认）
//!
//! ```bash
//! # 连接本机 AirSim，按 w/a/s/d 平移，q/e 转向，PageUp/PageDown 升降，Esc 退出
//! teleop fly
//!
//! # 无需 AirSim 的演练
//! teleop --backend mock fly
//! ```
//!
//! ## One-shot 模式
//!
//! ```bash
//! teleop takeoff
//! teleop goto 10 0 -5 --velocity 3
//! teleop rc 0 5 0 -10
//! teleop config show
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod input;
mod modes;

use commands::{ConfigCommand, GotoCommand, RcCommand};
use config::{Backend, CliConfig, default_config_file};
use modes::oneshot::OneShotMode;

/// Teleop CLI - 多旋翼键盘遥控
#[derive(Parser, Debug)]
#[command(name = "teleop")]
#[command(about = "Keyboard teleoperation of an AirSim multirotor", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// 覆盖配置文件的全局参数
#[derive(clap::Args, Debug, Clone, Default, PartialEq)]
struct GlobalArgs {
    /// 配置文件路径
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 模拟器后端
    #[arg(long, value_enum, global = true)]
    backend: Option<Backend>,

    /// AirSim 主机
    #[arg(long, global = true)]
    host: Option<String>,

    /// AirSim RPC 端口
    #[arg(long, global = true)]
    port: Option<u16>,

    /// 会话日志文件（每次运行覆盖）
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

impl GlobalArgs {
    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => default_config_file(),
        }
    }

    fn apply(&self, config: &mut CliConfig) {
        if let Some(backend) = self.backend {
            config.simulator.backend = backend;
        }
        if let Some(host) = &self.host {
            config.simulator.host = host.clone();
        }
        if let Some(port) = self.port {
            config.simulator.port = port;
        }
        if let Some(file) = &self.log_file {
            config.log.file = file.clone();
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Commands {
    /// 键盘遥控会话（默认）
    Fly,

    /// 起飞并等待完成
    Takeoff,

    /// 飞到 NED 目标点
    Goto {
        #[command(flatten)]
        args: GotoCommand,
    },

    /// 四通道遥控指令
    Rc {
        #[command(flatten)]
        args: RcCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.global.config_path()?;
    let mut config = CliConfig::load(&path)?;
    cli.global.apply(&mut config);

    match cli.command.unwrap_or(Commands::Fly) {
        Commands::Fly => modes::interactive::run(&config),

        Commands::Takeoff => {
            let mode = OneShotMode::connect(&config)?;
            println!("🛫 起飞...");
            mode.dispatcher().takeoff().context("起飞失败")?;
            println!("✅ 起飞完成");
            Ok(())
        },

        Commands::Goto { args } => args.execute(&config),

        Commands::Rc { args } => args.execute(&config),

        Commands::Config(cmd) => cmd.execute(&path, &config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_fly() {
        let cli = Cli::try_parse_from(["teleop"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.global, GlobalArgs::default());
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "teleop",
            "fly",
            "--backend",
            "mock",
            "--port",
            "41452",
            "--log-file",
            "/tmp/teleop.log",
        ])
        .unwrap();

        let mut config = CliConfig::default();
        cli.global.apply(&mut config);
        assert_eq!(config.simulator.backend, Backend::Mock);
        assert_eq!(config.simulator.port, 41452);
        assert_eq!(config.simulator.host, "127.0.0.1");
        assert_eq!(config.log.file, PathBuf::from("/tmp/teleop.log"));
    }

    #[test]
    fn test_goto_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["teleop", "goto", "10", "-2.5", "-5", "--no-wait"]).unwrap();
        let Some(Commands::Goto { args }) = cli.command else {
            panic!("expected goto");
        };
        assert_eq!((args.x, args.y, args.z), (10.0, -2.5, -5.0));
        assert_eq!(args.velocity, 5.0);
        assert!(args.no_wait);
    }

    #[test]
    fn test_rc_channels() {
        let cli = Cli::try_parse_from(["teleop", "rc", "-3", "4", "0", "-10"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Rc {
                args: RcCommand {
                    left_right: -3,
                    forward_backward: 4,
                    up_down: 0,
                    yaw: -10,
                }
            })
        );
    }

    #[test]
    fn test_config_subcommand() {
        let cli = Cli::try_parse_from(["teleop", "--config", "/tmp/x.toml", "config", "path"])
            .unwrap();
        assert_eq!(cli.command, Some(Commands::Config(ConfigCommand::Path)));
        assert_eq!(cli.global.config_path().unwrap(), PathBuf::from("/tmp/x.toml"));
    }
}
