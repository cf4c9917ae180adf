//! 离散动作
//!
//! 每个按键映射到一个 [`ActionKind`]，再结合 [`Magnitudes`] 得到带幅值的 [`Action`]。

use crate::error::InputError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 默认平移速率（m/s）
pub const DEFAULT_SPEED: f64 = 5.0;
/// 默认单次转向角度（度）
pub const DEFAULT_TURN_DEGREES: f64 = 5.0;
/// 默认垂直速率（m/s）
pub const DEFAULT_VERTICAL_SPEED: f64 = 2.0;

/// 平移与转向指令的持续时间
pub const TRANSLATION_DURATION: Duration = Duration::from_secs(1);
/// 升降指令的持续时间
pub const VERTICAL_DURATION: Duration = Duration::from_millis(500);

/// 动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Forward,
    Back,
    Left,
    Right,
    TurnRight,
    TurnLeft,
    Up,
    Down,
    Hover,
    Takeoff,
    Goto,
}

impl ActionKind {
    /// 可绑定到按键的动作（不含 `Goto`）
    pub const BINDABLE: [ActionKind; 10] = [
        ActionKind::Forward,
        ActionKind::Back,
        ActionKind::Left,
        ActionKind::Right,
        ActionKind::TurnRight,
        ActionKind::TurnLeft,
        ActionKind::Up,
        ActionKind::Down,
        ActionKind::Hover,
        ActionKind::Takeoff,
    ];

    /// 日志中使用的名称（`Command received: <label>`）
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Forward => "Move Forward",
            ActionKind::Back => "Move Back",
            ActionKind::Left => "Move Left",
            ActionKind::Right => "Move Right",
            ActionKind::TurnRight => "Turn Right",
            ActionKind::TurnLeft => "Turn Left",
            ActionKind::Up => "Move Up",
            ActionKind::Down => "Move Down",
            ActionKind::Hover => "Hover",
            ActionKind::Takeoff => "Takeoff",
            ActionKind::Goto => "goto",
        }
    }

    /// 是否为速度指令（失败时受 `ErrorPolicy` 控制）
    pub fn is_velocity(self) -> bool {
        matches!(
            self,
            ActionKind::Forward
                | ActionKind::Back
                | ActionKind::Left
                | ActionKind::Right
                | ActionKind::TurnRight
                | ActionKind::TurnLeft
                | ActionKind::Up
                | ActionKind::Down
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Forward => "forward",
            ActionKind::Back => "back",
            ActionKind::Left => "left",
            ActionKind::Right => "right",
            ActionKind::TurnRight => "turn_right",
            ActionKind::TurnLeft => "turn_left",
            ActionKind::Up => "up",
            ActionKind::Down => "down",
            ActionKind::Hover => "hover",
            ActionKind::Takeoff => "takeoff",
            ActionKind::Goto => "goto",
        };
        f.write_str(name)
    }
}

impl FromStr for ActionKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::BINDABLE
            .into_iter()
            .chain([ActionKind::Goto])
            .find(|kind| kind.to_string() == s)
            .ok_or_else(|| InputError::UnknownAction(s.to_string()))
    }
}

/// 按键动作使用的幅值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Magnitudes {
    /// 平移速率（m/s）
    pub speed: f64,
    /// 单次转向角度（度）
    pub turn_degrees: f64,
    /// 垂直速率（m/s）
    pub vertical_speed: f64,
}

impl Default for Magnitudes {
    fn default() -> Self {
        Self {
            speed: DEFAULT_SPEED,
            turn_degrees: DEFAULT_TURN_DEGREES,
            vertical_speed: DEFAULT_VERTICAL_SPEED,
        }
    }
}

/// 带幅值的动作
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Forward(f64),
    Back(f64),
    Left(f64),
    Right(f64),
    TurnRight(f64),
    TurnLeft(f64),
    Up(f64),
    Down(f64),
    Hover,
    Takeoff,
    /// NED 目标点；`must_finish = false` 时阻塞到到达
    Goto {
        x: f64,
        y: f64,
        z: f64,
        velocity: f64,
        must_finish: bool,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Forward(_) => ActionKind::Forward,
            Action::Back(_) => ActionKind::Back,
            Action::Left(_) => ActionKind::Left,
            Action::Right(_) => ActionKind::Right,
            Action::TurnRight(_) => ActionKind::TurnRight,
            Action::TurnLeft(_) => ActionKind::TurnLeft,
            Action::Up(_) => ActionKind::Up,
            Action::Down(_) => ActionKind::Down,
            Action::Hover => ActionKind::Hover,
            Action::Takeoff => ActionKind::Takeoff,
            Action::Goto { .. } => ActionKind::Goto,
        }
    }

    /// 用配置的幅值构造动作；`Goto` 需要目标点，返回 `None`
    pub fn from_kind(kind: ActionKind, magnitudes: &Magnitudes) -> Option<Self> {
        let action = match kind {
            ActionKind::Forward => Action::Forward(magnitudes.speed),
            ActionKind::Back => Action::Back(magnitudes.speed),
            ActionKind::Left => Action::Left(magnitudes.speed),
            ActionKind::Right => Action::Right(magnitudes.speed),
            ActionKind::TurnRight => Action::TurnRight(magnitudes.turn_degrees),
            ActionKind::TurnLeft => Action::TurnLeft(magnitudes.turn_degrees),
            ActionKind::Up => Action::Up(magnitudes.vertical_speed),
            ActionKind::Down => Action::Down(magnitudes.vertical_speed),
            ActionKind::Hover => Action::Hover,
            ActionKind::Takeoff => Action::Takeoff,
            ActionKind::Goto => return None,
        };
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_kind_uses_magnitudes() {
        let m = Magnitudes {
            speed: 3.0,
            turn_degrees: 15.0,
            vertical_speed: 1.0,
        };
        assert_eq!(
            Action::from_kind(ActionKind::Forward, &m),
            Some(Action::Forward(3.0))
        );
        assert_eq!(
            Action::from_kind(ActionKind::TurnLeft, &m),
            Some(Action::TurnLeft(15.0))
        );
        assert_eq!(Action::from_kind(ActionKind::Down, &m), Some(Action::Down(1.0)));
        assert_eq!(Action::from_kind(ActionKind::Goto, &m), None);
    }

    #[test]
    fn test_kind_round_trip() {
        let m = Magnitudes::default();
        for kind in ActionKind::BINDABLE {
            let action = Action::from_kind(kind, &m).unwrap();
            assert_eq!(action.kind(), kind);
        }
    }

    #[test]
    fn test_velocity_kinds() {
        assert!(ActionKind::TurnLeft.is_velocity());
        assert!(!ActionKind::Hover.is_velocity());
        assert!(!ActionKind::Takeoff.is_velocity());
        assert!(!ActionKind::Goto.is_velocity());
    }

    #[test]
    fn test_display_matches_serde_name() {
        assert_eq!(ActionKind::TurnRight.to_string(), "turn_right");
        assert_eq!(ActionKind::Forward.label(), "Move Forward");
        assert_eq!("turn_right".parse::<ActionKind>().unwrap(), ActionKind::TurnRight);
        assert_eq!("goto".parse::<ActionKind>().unwrap(), ActionKind::Goto);
        assert!("jump".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_default_magnitudes() {
        let m = Magnitudes::default();
        assert_eq!(m.speed, 5.0);
        assert_eq!(m.turn_degrees, 5.0);
        assert_eq!(m.vertical_speed, 2.0);
    }
}
