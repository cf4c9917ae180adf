//! 配置管理命令

use anyhow::{Context, Result};
use clap::Subcommand;
use std::fs;
use std::path::Path;

use crate::config::CliConfig;

/// 配置命令
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// 显示生效的配置（文件 + 命令行覆盖）
    Show,

    /// 显示配置文件路径
    Path,

    /// 写入默认配置文件
    Init {
        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(&self, path: &Path, config: &CliConfig) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                println!("# {}", path.display());
                print!("{}", config.to_toml()?);
            },

            ConfigCommand::Path => {
                println!("{}", path.display());
            },

            ConfigCommand::Init { force } => {
                if path.exists() && !force {
                    anyhow::bail!("配置文件已存在: {}（使用 --force 覆盖）", path.display());
                }
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).context("创建配置目录失败")?;
                }
                fs::write(path, CliConfig::default().to_toml()?).context("写入配置文件失败")?;
                println!("✅ 已写入默认配置: {}", path.display());
            },
        }

        Ok(())
    }
}
