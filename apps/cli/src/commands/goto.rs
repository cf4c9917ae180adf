//! 定点飞行命令

use anyhow::{Context, Result};
use clap::Args;

use crate::config::CliConfig;
use crate::modes::oneshot::OneShotMode;

/// 定点飞行参数（NED 坐标，z 向上为负）
#[derive(Args, Debug, Clone, PartialEq)]
pub struct GotoCommand {
    /// 北向（m）
    #[arg(allow_negative_numbers = true)]
    pub x: f64,

    /// 东向（m）
    #[arg(allow_negative_numbers = true)]
    pub y: f64,

    /// 向下（m），例如 -10 表示 10 m 高度
    #[arg(allow_negative_numbers = true)]
    pub z: f64,

    /// 飞行速度（m/s）
    #[arg(short, long, default_value_t = 5.0)]
    pub velocity: f64,

    /// 发出指令后立即返回，不等待到达
    #[arg(long)]
    pub no_wait: bool,
}

impl GotoCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        if self.velocity <= 0.0 || !self.velocity.is_finite() {
            anyhow::bail!("速度必须为正数: {}", self.velocity);
        }

        let mode = OneShotMode::connect(config)?;
        let dispatcher = mode.dispatcher();

        println!(
            "📡 飞往 ({:.2}, {:.2}, {:.2})，速度 {:.1} m/s...",
            self.x, self.y, self.z, self.velocity
        );
        // no_wait 对应 must_finish = true（发出即返回）
        dispatcher
            .goto(self.x, self.y, self.z, self.velocity, self.no_wait)
            .context("定点飞行失败")?;

        if self.no_wait {
            println!("✅ 指令已发出");
        } else {
            println!("✅ 已到达目标点");
        }
        Ok(())
    }
}
