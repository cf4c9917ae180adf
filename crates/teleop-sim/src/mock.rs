//! 进程内模拟器
//!
//! 不依赖 AirSim 的 `Simulator` 实现，用于测试和无模拟器的演练（`--backend mock`）。
//!
//! - 记录所有被接受的指令（`commands()`）
//! - 速度指令按 `v * duration` 立即积分到位置
//! - 运动指令要求已连接、已启用 API 控制、已解锁，否则返回 `SimError::NotReady`
//! - 支持故障注入（`set_fail_commands` / `set_fail_queries`）
//! - 支持挂起异步指令的完成（`hold_completions` / `release_completions`），
//!   用于区分阻塞调用与发后不管

use crate::Simulator;
use crate::completion::{Completion, Reply};
use crate::error::SimError;
use crate::types::*;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// 起飞后的悬停高度（NED，向上为负）
const TAKEOFF_ALTITUDE: f64 = -3.0;

/// 模拟器收到的指令
#[derive(Debug, Clone, PartialEq)]
pub enum SimCommand {
    ConfirmConnection,
    Reset,
    EnableApiControl(bool),
    ArmDisarm(bool),
    MoveByVelocity(VelocityCommand),
    MoveToPosition(PositionCommand),
    Hover,
    Takeoff(Duration),
}

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    api_control: bool,
    armed: bool,
    flying: bool,
    position: Vector3r,
    velocity: Vector3r,
    commands: Vec<SimCommand>,
    state_queries: u64,
    collision_queries: u64,
}

/// 进程内模拟器
pub struct MockSimulator {
    state: Mutex<MockState>,
    fail_commands: AtomicBool,
    fail_queries: AtomicBool,
    query_tx: Mutex<Option<Sender<u64>>>,
    // Some 时新的异步指令返回未完成句柄
    held: Mutex<Option<Vec<Sender<Reply>>>>,
    started: Instant,
}

impl MockSimulator {
    /// 未连接状态（需要依次 confirm / enable / arm）
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            fail_commands: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
            query_tx: Mutex::new(None),
            held: Mutex::new(None),
            started: Instant::now(),
        }
    }

    /// 已连接、已启用 API 控制、已解锁
    pub fn ready() -> Self {
        let sim = Self::new();
        {
            let mut state = sim.state.lock();
            state.connected = true;
            state.api_control = true;
            state.armed = true;
        }
        sim
    }

    /// 之后的所有指令调用都返回 `SimError::Rejected`
    pub fn set_fail_commands(&self, fail: bool) {
        self.fail_commands.store(fail, Ordering::Relaxed);
    }

    /// 之后的所有查询调用都返回 `SimError::Rejected`
    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::Relaxed);
    }

    /// 已接受的指令（按接收顺序）
    pub fn commands(&self) -> Vec<SimCommand> {
        self.state.lock().commands.clone()
    }

    /// 已接受的速度指令
    pub fn velocity_commands(&self) -> Vec<VelocityCommand> {
        self.state
            .lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                SimCommand::MoveByVelocity(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    /// 最后一条速度指令
    pub fn last_velocity_command(&self) -> Option<VelocityCommand> {
        self.velocity_commands().pop()
    }

    pub fn position(&self) -> Vector3r {
        self.state.lock().position
    }

    pub fn is_armed(&self) -> bool {
        self.state.lock().armed
    }

    pub fn api_control_enabled(&self) -> bool {
        self.state.lock().api_control
    }

    /// (状态查询次数, 碰撞查询次数)
    pub fn query_counts(&self) -> (u64, u64) {
        let state = self.state.lock();
        (state.state_queries, state.collision_queries)
    }

    /// 每次状态查询后收到累计查询次数
    pub fn subscribe_queries(&self) -> Receiver<u64> {
        let (tx, rx) = unbounded();
        *self.query_tx.lock() = Some(tx);
        rx
    }

    /// 之后的异步指令（速度、定点、悬停、起飞）返回未完成的句柄，
    /// 直到 [`release_completions`](Self::release_completions)
    pub fn hold_completions(&self) {
        self.held.lock().get_or_insert_with(Vec::new);
    }

    /// 完成所有挂起的句柄，并恢复为立即完成
    pub fn release_completions(&self) {
        if let Some(senders) = self.held.lock().take() {
            for tx in senders {
                // 调用方可能已丢弃句柄
                let _ = tx.send(Ok(rmpv::Value::Nil));
            }
        }
    }

    /// 尚未完成的句柄数
    pub fn held_completions(&self) -> usize {
        self.held.lock().as_ref().map_or(0, Vec::len)
    }

    fn completion(&self, method: &'static str) -> Completion {
        match self.held.lock().as_mut() {
            Some(senders) => {
                let (tx, rx) = bounded(1);
                senders.push(tx);
                Completion::pending(method, rx)
            },
            None => Completion::done(),
        }
    }

    fn check_command(&self) -> Result<(), SimError> {
        if self.fail_commands.load(Ordering::Relaxed) {
            return Err(SimError::Rejected("injected failure".to_string()));
        }
        Ok(())
    }

    fn check_query(&self) -> Result<(), SimError> {
        if self.fail_queries.load(Ordering::Relaxed) {
            return Err(SimError::Rejected("injected failure".to_string()));
        }
        Ok(())
    }

    fn check_ready(state: &MockState) -> Result<(), SimError> {
        if !state.connected {
            return Err(SimError::NotReady("not connected".to_string()));
        }
        if !state.api_control {
            return Err(SimError::NotReady("API control not enabled".to_string()));
        }
        if !state.armed {
            return Err(SimError::NotReady("vehicle not armed".to_string()));
        }
        Ok(())
    }

    fn timestamp_ns(&self) -> u64 {
        self.started.elapsed().as_nanos() as u64
    }
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator for MockSimulator {
    fn confirm_connection(&self) -> Result<(), SimError> {
        self.check_command()?;
        let mut state = self.state.lock();
        state.connected = true;
        state.commands.push(SimCommand::ConfirmConnection);
        Ok(())
    }

    fn reset(&self) -> Result<(), SimError> {
        self.check_command()?;
        let mut state = self.state.lock();
        state.api_control = false;
        state.armed = false;
        state.flying = false;
        state.position = Vector3r::ZERO;
        state.velocity = Vector3r::ZERO;
        state.commands.push(SimCommand::Reset);
        Ok(())
    }

    fn enable_api_control(&self, enabled: bool) -> Result<(), SimError> {
        self.check_command()?;
        let mut state = self.state.lock();
        if !state.connected {
            return Err(SimError::NotReady("not connected".to_string()));
        }
        state.api_control = enabled;
        state.commands.push(SimCommand::EnableApiControl(enabled));
        Ok(())
    }

    fn arm_disarm(&self, arm: bool) -> Result<bool, SimError> {
        self.check_command()?;
        let mut state = self.state.lock();
        if !state.api_control {
            return Ok(false);
        }
        state.armed = arm;
        state.commands.push(SimCommand::ArmDisarm(arm));
        Ok(true)
    }

    fn move_by_velocity(&self, command: &VelocityCommand) -> Result<Completion, SimError> {
        self.check_command()?;
        let mut state = self.state.lock();
        Self::check_ready(&state)?;

        let dt = command.duration.as_secs_f64();
        state.velocity = command.velocity();
        state.position.x += command.vx * dt;
        state.position.y += command.vy * dt;
        state.position.z += command.vz * dt;
        state.commands.push(SimCommand::MoveByVelocity(*command));
        drop(state);
        Ok(self.completion("moveByVelocity"))
    }

    fn move_to_position(&self, command: &PositionCommand) -> Result<Completion, SimError> {
        self.check_command()?;
        let mut state = self.state.lock();
        Self::check_ready(&state)?;

        state.position = command.target();
        state.velocity = Vector3r::ZERO;
        state.commands.push(SimCommand::MoveToPosition(*command));
        drop(state);
        Ok(self.completion("moveToPosition"))
    }

    fn hover(&self) -> Result<Completion, SimError> {
        self.check_command()?;
        let mut state = self.state.lock();
        Self::check_ready(&state)?;

        state.velocity = Vector3r::ZERO;
        state.commands.push(SimCommand::Hover);
        drop(state);
        Ok(self.completion("hover"))
    }

    fn takeoff(&self, timeout: Duration) -> Result<Completion, SimError> {
        self.check_command()?;
        let mut state = self.state.lock();
        Self::check_ready(&state)?;

        state.flying = true;
        state.position.z = TAKEOFF_ALTITUDE;
        state.velocity = Vector3r::ZERO;
        state.commands.push(SimCommand::Takeoff(timeout));
        drop(state);
        Ok(self.completion("takeoff"))
    }

    fn multirotor_state(&self) -> Result<MultirotorState, SimError> {
        self.check_query()?;
        let timestamp = self.timestamp_ns();

        let (snapshot, count) = {
            let mut state = self.state.lock();
            state.state_queries += 1;
            let snapshot = MultirotorState {
                kinematics_estimated: KinematicsState {
                    position: state.position,
                    linear_velocity: state.velocity,
                    ..KinematicsState::default()
                },
                timestamp,
                landed_state: if state.flying {
                    LandedState::Flying
                } else {
                    LandedState::Landed
                },
                ready: state.armed,
                can_arm: state.api_control,
                ..MultirotorState::default()
            };
            (snapshot, state.state_queries)
        };

        if let Some(tx) = self.query_tx.lock().as_ref() {
            let _ = tx.send(count);
        }
        Ok(snapshot)
    }

    fn collision_info(&self) -> Result<CollisionInfo, SimError> {
        self.check_query()?;
        let mut state = self.state.lock();
        state.collision_queries += 1;
        Ok(CollisionInfo {
            position: state.position,
            ..CollisionInfo::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_motion_requires_ready_vehicle() {
        let sim = MockSimulator::new();
        let cmd = VelocityCommand::holding_heading(
            Vector3r::new(1.0, 0.0, 0.0),
            Duration::from_secs(1),
            0.0,
        );
        assert!(matches!(
            sim.move_by_velocity(&cmd),
            Err(SimError::NotReady(_))
        ));

        sim.confirm_connection().unwrap();
        sim.enable_api_control(true).unwrap();
        assert!(sim.arm_disarm(true).unwrap());
        assert!(sim.move_by_velocity(&cmd).is_ok());
    }

    #[test]
    fn test_arm_without_api_control_is_refused() {
        let sim = MockSimulator::new();
        sim.confirm_connection().unwrap();
        assert!(!sim.arm_disarm(true).unwrap());
        assert!(!sim.is_armed());
    }

    #[test]
    fn test_velocity_integration() {
        let sim = MockSimulator::ready();
        let cmd = VelocityCommand::holding_heading(
            Vector3r::new(2.0, -1.0, 0.0),
            Duration::from_millis(500),
            0.0,
        );
        sim.move_by_velocity(&cmd).unwrap();
        sim.move_by_velocity(&cmd).unwrap();

        let p = sim.position();
        assert_relative_eq!(p.x, 2.0);
        assert_relative_eq!(p.y, -1.0);
        assert_eq!(sim.velocity_commands().len(), 2);
    }

    #[test]
    fn test_reset_disarms() {
        let sim = MockSimulator::ready();
        sim.takeoff(Duration::from_secs(20)).unwrap().join().unwrap();
        assert_relative_eq!(sim.position().z, TAKEOFF_ALTITUDE);

        sim.reset().unwrap();
        assert!(!sim.is_armed());
        assert!(!sim.api_control_enabled());
        assert_eq!(sim.position(), Vector3r::ZERO);
    }

    #[test]
    fn test_failure_injection() {
        let sim = MockSimulator::ready();
        sim.set_fail_commands(true);
        assert!(matches!(sim.hover(), Err(SimError::Rejected(_))));
        assert!(sim.commands().is_empty());

        // 查询不受指令故障影响
        assert!(sim.multirotor_state().is_ok());
        sim.set_fail_queries(true);
        assert!(sim.collision_info().is_err());
    }

    #[test]
    fn test_query_notifications() {
        let sim = MockSimulator::ready();
        let rx = sim.subscribe_queries();

        sim.multirotor_state().unwrap();
        sim.multirotor_state().unwrap();
        sim.collision_info().unwrap();

        assert_eq!(rx.try_recv().unwrap(), 1);
        assert_eq!(rx.try_recv().unwrap(), 2);
        assert!(rx.try_recv().is_err());
        assert_eq!(sim.query_counts(), (2, 1));
    }

    #[test]
    fn test_held_completions() {
        let sim = MockSimulator::ready();
        sim.hold_completions();

        let hover = sim.hover().unwrap();
        let takeoff = sim.takeoff(Duration::from_secs(20)).unwrap();
        assert!(!hover.is_finished());
        assert!(!takeoff.is_finished());
        assert_eq!(sim.held_completions(), 2);

        // 指令本身已被接受
        assert_eq!(sim.commands().len(), 2);

        drop(hover);
        sim.release_completions();
        assert!(takeoff.is_finished());
        assert!(takeoff.join().is_ok());
        assert_eq!(sim.held_completions(), 0);

        // 释放后恢复立即完成
        assert!(sim.hover().unwrap().is_finished());
    }
}
