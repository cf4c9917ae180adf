//! 四通道遥控命令

use anyhow::{Context, Result};
use clap::Args;
use teleop_control::RcFacade;

use crate::config::CliConfig;
use crate::modes::oneshot::OneShotMode;

/// 四通道遥控参数：符号决定方向，绝对值为幅值
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct RcCommand {
    /// 左右（> 0 向右）
    #[arg(allow_negative_numbers = true)]
    pub left_right: i32,

    /// 前后（> 0 向前）
    #[arg(allow_negative_numbers = true)]
    pub forward_backward: i32,

    /// 升降（> 0 上升）
    #[arg(allow_negative_numbers = true)]
    pub up_down: i32,

    /// 偏航（> 0 右转，单位：度）
    #[arg(allow_negative_numbers = true)]
    pub yaw: i32,
}

impl RcCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let mode = OneShotMode::connect(config)?;
        let dispatcher = mode.dispatcher();
        let mut rc = RcFacade::new(dispatcher);

        println!(
            "📡 rc {} {} {} {}",
            self.left_right, self.forward_backward, self.up_down, self.yaw
        );
        rc.send_rc_control(self.left_right, self.forward_backward, self.up_down, self.yaw)
            .context("遥控指令失败")?;

        let dispatcher = rc.into_dispatcher();
        let snapshot = dispatcher.metrics().snapshot();
        println!(
            "✅ 已发出 {} 条指令（拒绝 {}），航向 {}",
            snapshot.issued,
            snapshot.rejected,
            dispatcher.heading()
        );
        Ok(())
    }
}
