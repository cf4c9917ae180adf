//! 四轴遥控接口
//!
//! 面向"四通道遥控"风格调用方的适配层：每个通道的符号选择方向，绝对值作为幅值，
//! 依次分发到 [`Dispatcher`]。
//!
//! | 通道 | > 0 | ≤ 0 |
//! |------|-----|-----|
//! | forward_backward | forward | back |
//! | left_right | right | left |
//! | up_down | up | down |
//! | yaw | turn_right | turn_left |
//!
//! 零值落入 ≤ 0 分支，并使用该动作的默认幅值。

use crate::action::{DEFAULT_SPEED, DEFAULT_TURN_DEGREES, DEFAULT_VERTICAL_SPEED};
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

pub struct RcFacade {
    dispatcher: Dispatcher,
}

impl RcFacade {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn into_dispatcher(self) -> Dispatcher {
        self.dispatcher
    }

    /// 按 前后 → 左右 → 升降 → 偏航 的顺序分发四个通道
    pub fn send_rc_control(
        &mut self,
        left_right: i32,
        forward_backward: i32,
        up_down: i32,
        yaw: i32,
    ) -> Result<(), DispatchError> {
        let d = &mut self.dispatcher;

        if forward_backward > 0 {
            d.forward(magnitude(forward_backward, DEFAULT_SPEED))?;
        } else {
            d.back(magnitude(forward_backward, DEFAULT_SPEED))?;
        }

        if left_right > 0 {
            d.right(magnitude(left_right, DEFAULT_SPEED))?;
        } else {
            d.left(magnitude(left_right, DEFAULT_SPEED))?;
        }

        if up_down > 0 {
            d.up(magnitude(up_down, DEFAULT_VERTICAL_SPEED))?;
        } else {
            d.down(magnitude(up_down, DEFAULT_VERTICAL_SPEED))?;
        }

        if yaw > 0 {
            d.turn_right(magnitude(yaw, DEFAULT_TURN_DEGREES))?;
        } else {
            d.turn_left(magnitude(yaw, DEFAULT_TURN_DEGREES))?;
        }

        Ok(())
    }

    pub fn takeoff(&mut self) -> Result<(), DispatchError> {
        self.dispatcher.takeoff()
    }
}

fn magnitude(value: i32, default: f64) -> f64 {
    match value {
        0 => default,
        v => f64::from(v).abs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_sink::LogSink;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use teleop_sim::{MockSimulator, SimCommand};

    fn setup() -> (Arc<MockSimulator>, RcFacade, crate::log_sink::MemoryLog) {
        let sim = Arc::new(MockSimulator::ready());
        let (sink, log) = LogSink::in_memory("teleop");
        (sim.clone(), RcFacade::new(Dispatcher::new(sim, sink)), log)
    }

    #[test]
    fn test_channel_order_and_signs() {
        let (sim, mut rc, log) = setup();
        rc.send_rc_control(-3, 4, 2, 10).unwrap();

        let cmds = sim.velocity_commands();
        assert_eq!(cmds.len(), 4);
        // forward 4
        assert_relative_eq!(cmds[0].vx, 4.0);
        // left 3 at heading 0 → -y
        assert_relative_eq!(cmds[1].vy, -3.0);
        // up 2
        assert_relative_eq!(cmds[2].vz, -2.0);
        // turn right 10
        assert_relative_eq!(cmds[3].yaw_mode.yaw_or_rate, 10.0);
        assert_relative_eq!(rc.dispatcher().heading().degrees(), 10.0);

        let received: Vec<String> = log
            .records()
            .into_iter()
            .filter_map(|r| r.split_once("Command received: ").map(|(_, m)| m.to_string()))
            .collect();
        assert_eq!(
            received,
            ["Move Forward", "Move Left", "Move Up", "Turn right by 10 degrees"]
        );
    }

    #[test]
    fn test_all_zero_takes_non_positive_branch_at_defaults() {
        let (sim, mut rc, log) = setup();
        rc.send_rc_control(0, 0, 0, 0).unwrap();

        let cmds = sim.velocity_commands();
        assert_eq!(cmds.len(), 4);
        assert_relative_eq!(cmds[0].vx, -DEFAULT_SPEED);
        assert_relative_eq!(cmds[1].vy, -DEFAULT_SPEED);
        assert_relative_eq!(cmds[2].vz, DEFAULT_VERTICAL_SPEED);
        assert_relative_eq!(cmds[3].yaw_mode.yaw_or_rate, -DEFAULT_TURN_DEGREES);
        assert_eq!(log.count_containing("Move Back"), 1);
        assert_eq!(log.count_containing("Move Left"), 1);
        assert_eq!(log.count_containing("Move Down"), 1);
        assert_eq!(log.count_containing("Turn left by 5 degrees"), 1);
        assert_relative_eq!(rc.dispatcher().heading().degrees(), -DEFAULT_TURN_DEGREES);
    }


    #[test]
    fn test_takeoff() {
        let (sim, mut rc, _log) = setup();
        rc.takeoff().unwrap();
        assert!(matches!(sim.commands()[0], SimCommand::Takeoff(_)));
        assert_eq!(rc.into_dispatcher().metrics().snapshot().issued, 1);
    }
}
