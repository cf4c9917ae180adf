//! # Teleop Simulator Layer
//!
//! 模拟器连接抽象层，为上层的指令分发与遥测记录提供统一的 `Simulator` 接口。
//!
//! ## 包含模块
//!
//! - `airsim` - AirSim msgpack-RPC 客户端（TCP，独立接收线程）
//! - `mock` - 进程内模拟器（feature `mock`，无需 AirSim）
//! - `types` - 运动学、碰撞信息、速度/位置指令等纯数据结构
//! - `completion` - 异步指令的完成句柄
//!
//! ## 线程模型
//!
//! `Simulator` 要求 `Send + Sync`：同一个连接会以 `Arc<dyn Simulator>` 的形式
//! 同时交给指令分发线程和遥测线程使用，实现方自行保证并发调用安全。

use std::time::Duration;

pub mod airsim;
pub mod completion;
mod error;
#[cfg(feature = "mock")]
pub mod mock;
pub mod types;

pub use airsim::{AirSimClient, AirSimConfig};
pub use completion::Completion;
pub use error::SimError;
#[cfg(feature = "mock")]
pub use mock::{MockSimulator, SimCommand};
pub use types::*;

/// 默认起飞超时
pub const DEFAULT_TAKEOFF_TIMEOUT: Duration = Duration::from_secs(20);

/// 多旋翼模拟器连接
///
/// 除 `Completion` 形式返回的异步指令外，所有方法都是同步调用。
/// 异步指令（速度、位置、悬停、起飞）在模拟器接受后立即返回：
/// - 丢弃 `Completion` 即“发后不管”（fire-and-forget）
/// - 调用 `Completion::join()` 则阻塞直到模拟器报告完成
pub trait Simulator: Send + Sync {
    /// 确认连接可用
    fn confirm_connection(&self) -> Result<(), SimError>;

    /// 重置模拟器
    fn reset(&self) -> Result<(), SimError>;

    /// 启用/禁用 API 控制
    fn enable_api_control(&self, enabled: bool) -> Result<(), SimError>;

    /// 解锁/上锁，返回模拟器是否接受
    fn arm_disarm(&self, arm: bool) -> Result<bool, SimError>;

    /// 速度指令
    fn move_by_velocity(&self, command: &VelocityCommand) -> Result<Completion, SimError>;

    /// 位置指令
    fn move_to_position(&self, command: &PositionCommand) -> Result<Completion, SimError>;

    /// 原地悬停
    fn hover(&self) -> Result<Completion, SimError>;

    /// 起飞
    fn takeoff(&self, timeout: Duration) -> Result<Completion, SimError>;

    /// 完整飞行器状态
    fn multirotor_state(&self) -> Result<MultirotorState, SimError>;

    /// 最近一次碰撞信息
    fn collision_info(&self) -> Result<CollisionInfo, SimError>;
}
