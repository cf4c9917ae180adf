//! 指令分发器
//!
//! 持有累积航向，将离散动作转换为模拟器指令：
//!
//! - 平移：按航向旋转后的水平速度，持续 1 s，偏航保持在当前航向
//! - 转向：只修改航向，发送零速度指令让机头转到新航向
//! - 升降：垂直速度（NED，向上为负），持续 0.5 s
//! - 悬停 / 起飞 / 定点：直接转发
//!
//! 速度指令都是"发出即返回"，不等待执行完成。

use crate::action::{Action, ActionKind, TRANSLATION_DURATION, VERTICAL_DURATION};
use crate::error::DispatchError;
use crate::heading::{Direction, Heading};
use crate::log_sink::LogSink;
use crate::metrics::DispatchMetrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use teleop_sim::{
    DEFAULT_TAKEOFF_TIMEOUT, PositionCommand, SimError, Simulator, Vector3r, VelocityCommand,
};

/// 速度指令失败时的处理方式
///
/// 悬停、起飞、定点的失败总是返回给调用方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// 记录警告并返回 `CommandStatus::Rejected`
    #[default]
    BestEffort,
    /// 返回 `DispatchError`
    Strict,
}

/// 速度指令的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Issued,
    Rejected { reason: String },
}

impl CommandStatus {
    pub fn is_issued(&self) -> bool {
        matches!(self, CommandStatus::Issued)
    }
}

/// 指令分发器
///
/// 航向只由 `turn_right` / `turn_left` 修改，因此这两个方法需要 `&mut self`；
/// 其余动作只读航向。
pub struct Dispatcher {
    sim: Arc<dyn Simulator>,
    sink: LogSink,
    heading: Heading,
    policy: ErrorPolicy,
    takeoff_timeout: Duration,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    pub fn new(sim: Arc<dyn Simulator>, sink: LogSink) -> Self {
        Self {
            sim,
            sink,
            heading: Heading::ZERO,
            policy: ErrorPolicy::default(),
            takeoff_timeout: DEFAULT_TAKEOFF_TIMEOUT,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_heading(mut self, heading: Heading) -> Self {
        self.heading = heading;
        self
    }

    pub fn with_takeoff_timeout(mut self, timeout: Duration) -> Self {
        self.takeoff_timeout = timeout;
        self
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn policy(&self) -> ErrorPolicy {
        self.policy
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        self.metrics.clone()
    }

    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    pub fn forward(&self, speed: f64) -> Result<CommandStatus, DispatchError> {
        self.translate(ActionKind::Forward, Direction::Forward, speed)
    }

    pub fn back(&self, speed: f64) -> Result<CommandStatus, DispatchError> {
        self.translate(ActionKind::Back, Direction::Back, speed)
    }

    pub fn left(&self, speed: f64) -> Result<CommandStatus, DispatchError> {
        self.translate(ActionKind::Left, Direction::Left, speed)
    }

    pub fn right(&self, speed: f64) -> Result<CommandStatus, DispatchError> {
        self.translate(ActionKind::Right, Direction::Right, speed)
    }

    /// 航向 += degrees，然后发送零速度指令
    pub fn turn_right(&mut self, degrees: f64) -> Result<CommandStatus, DispatchError> {
        self.received(format_args!("Turn right by {} degrees", degrees));
        self.heading = self.heading.turned_right(degrees);
        self.fire(ActionKind::TurnRight, Vector3r::ZERO, TRANSLATION_DURATION)
    }

    /// 航向 -= degrees，然后发送零速度指令
    pub fn turn_left(&mut self, degrees: f64) -> Result<CommandStatus, DispatchError> {
        self.received(format_args!("Turn left by {} degrees", degrees));
        self.heading = self.heading.turned_left(degrees);
        self.fire(ActionKind::TurnLeft, Vector3r::ZERO, TRANSLATION_DURATION)
    }

    pub fn up(&self, speed: f64) -> Result<CommandStatus, DispatchError> {
        self.received(ActionKind::Up.label());
        self.fire(
            ActionKind::Up,
            Vector3r::new(0.0, 0.0, -speed),
            VERTICAL_DURATION,
        )
    }

    pub fn down(&self, speed: f64) -> Result<CommandStatus, DispatchError> {
        self.received(ActionKind::Down.label());
        self.fire(
            ActionKind::Down,
            Vector3r::new(0.0, 0.0, speed),
            VERTICAL_DURATION,
        )
    }

    /// 悬停（不等待完成）
    pub fn hover(&self) -> Result<(), DispatchError> {
        self.received(ActionKind::Hover.label());
        let result = self.sim.hover().map(drop);
        self.settle(ActionKind::Hover, result).map(drop)
    }

    /// 起飞，阻塞到完成或超时
    pub fn takeoff(&self) -> Result<(), DispatchError> {
        self.received(ActionKind::Takeoff.label());
        let result = self
            .sim
            .takeoff(self.takeoff_timeout)
            .and_then(|completion| completion.join());
        self.settle(ActionKind::Takeoff, result).map(drop)
    }

    /// 飞到 NED 目标点
    ///
    /// `must_finish = false` 时阻塞到到达；`must_finish = true` 时发出即返回。
    /// 标志语义与字面相反，沿用既有调用方的约定。
    pub fn goto(
        &self,
        x: f64,
        y: f64,
        z: f64,
        velocity: f64,
        must_finish: bool,
    ) -> Result<(), DispatchError> {
        self.received(ActionKind::Goto.label());
        let command = PositionCommand::new(x, y, z, velocity);
        let result = self.sim.move_to_position(&command).and_then(|completion| {
            if must_finish {
                Ok(())
            } else {
                completion.join()
            }
        });
        self.settle(ActionKind::Goto, result).map(drop)
    }

    /// 执行任意动作
    pub fn execute(&mut self, action: Action) -> Result<CommandStatus, DispatchError> {
        match action {
            Action::Forward(speed) => self.forward(speed),
            Action::Back(speed) => self.back(speed),
            Action::Left(speed) => self.left(speed),
            Action::Right(speed) => self.right(speed),
            Action::TurnRight(degrees) => self.turn_right(degrees),
            Action::TurnLeft(degrees) => self.turn_left(degrees),
            Action::Up(speed) => self.up(speed),
            Action::Down(speed) => self.down(speed),
            Action::Hover => self.hover().map(|_| CommandStatus::Issued),
            Action::Takeoff => self.takeoff().map(|_| CommandStatus::Issued),
            Action::Goto {
                x,
                y,
                z,
                velocity,
                must_finish,
            } => self
                .goto(x, y, z, velocity, must_finish)
                .map(|_| CommandStatus::Issued),
        }
    }

    fn translate(
        &self,
        kind: ActionKind,
        direction: Direction,
        speed: f64,
    ) -> Result<CommandStatus, DispatchError> {
        self.received(kind.label());
        let v = self.heading.horizontal_velocity(direction, speed);
        self.fire(kind, Vector3r::new(v.x, v.y, 0.0), TRANSLATION_DURATION)
    }

    fn fire(
        &self,
        kind: ActionKind,
        velocity: Vector3r,
        duration: Duration,
    ) -> Result<CommandStatus, DispatchError> {
        let command = VelocityCommand::holding_heading(velocity, duration, self.heading.degrees());
        let result = self.sim.move_by_velocity(&command).map(drop);
        self.settle(kind, result)
    }

    /// 统计结果；速度指令的失败按 `ErrorPolicy` 处理，其余总是返回错误
    fn settle(
        &self,
        kind: ActionKind,
        result: Result<(), SimError>,
    ) -> Result<CommandStatus, DispatchError> {
        match result {
            Ok(()) => {
                self.metrics.issued.fetch_add(1, Ordering::Relaxed);
                Ok(CommandStatus::Issued)
            },
            Err(e) if kind.is_velocity() && self.policy == ErrorPolicy::BestEffort => {
                self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
                self.sink
                    .warn(format_args!("{} command rejected: {}", kind.label(), e));
                Ok(CommandStatus::Rejected {
                    reason: e.to_string(),
                })
            },
            Err(e) => Err(self.propagate(kind, e)),
        }
    }

    fn propagate(&self, action: ActionKind, source: SimError) -> DispatchError {
        self.metrics.propagated.fetch_add(1, Ordering::Relaxed);
        DispatchError::Simulator { action, source }
    }

    fn received(&self, what: impl std::fmt::Display) {
        self.sink.info(format_args!("Command received: {}", what));
    }
}
