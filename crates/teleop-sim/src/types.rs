//! # 模拟器数据类型
//!
//! 字段命名与 AirSim 的 msgpack 结构保持一致（通过 `serde(rename)` 映射），
//! 坐标系为 NED：x 向北、y 向东、z 向下。

use serde::Deserialize;
use std::time::Duration;

/// 三维向量（AirSim `Vector3r`）
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Vector3r {
    #[serde(rename = "x_val")]
    pub x: f64,
    #[serde(rename = "y_val")]
    pub y: f64,
    #[serde(rename = "z_val")]
    pub z: f64,
}

impl Vector3r {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 姿态四元数（AirSim `Quaternionr`）
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Quaternionr {
    #[serde(rename = "w_val")]
    pub w: f64,
    #[serde(rename = "x_val")]
    pub x: f64,
    #[serde(rename = "y_val")]
    pub y: f64,
    #[serde(rename = "z_val")]
    pub z: f64,
}

impl Default for Quaternionr {
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

/// GPS 位置
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// 运动学状态（估计值）
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct KinematicsState {
    pub position: Vector3r,
    pub orientation: Quaternionr,
    pub linear_velocity: Vector3r,
    pub angular_velocity: Vector3r,
    pub linear_acceleration: Vector3r,
    pub angular_acceleration: Vector3r,
}

/// 碰撞信息（最近一次碰撞事件）
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct CollisionInfo {
    pub has_collided: bool,
    pub normal: Vector3r,
    pub impact_point: Vector3r,
    pub position: Vector3r,
    pub penetration_depth: f64,
    /// 纳秒时间戳
    pub time_stamp: u64,
    pub object_name: String,
    pub object_id: i64,
}

/// 着陆状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "u8")]
pub enum LandedState {
    #[default]
    Landed,
    Flying,
}

impl From<u8> for LandedState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Flying,
            _ => Self::Landed,
        }
    }
}

/// 完整飞行器状态（AirSim `MultirotorState`）
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct MultirotorState {
    pub collision: CollisionInfo,
    pub kinematics_estimated: KinematicsState,
    pub gps_location: GeoPoint,
    /// 纳秒时间戳
    pub timestamp: u64,
    pub landed_state: LandedState,
    pub ready: bool,
    pub ready_message: String,
    pub can_arm: bool,
}

/// 驱动模式
///
/// `MaxDegreeOfFreedom` 下机头朝向与运动方向无关，由 `YawMode` 单独控制。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum DrivetrainType {
    ForwardOnly = 0,
    #[default]
    MaxDegreeOfFreedom = 1,
}

impl DrivetrainType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 偏航模式
///
/// - `is_rate = false`：锁定到绝对航向 `yaw_or_rate`（度）
/// - `is_rate = true`：以 `yaw_or_rate`（度/秒）旋转
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawMode {
    pub is_rate: bool,
    pub yaw_or_rate: f64,
}

impl YawMode {
    /// 锁定航向（度）
    pub fn angle(degrees: f64) -> Self {
        Self {
            is_rate: false,
            yaw_or_rate: degrees,
        }
    }

    /// 偏航角速度（度/秒）
    pub fn rate(degrees_per_sec: f64) -> Self {
        Self {
            is_rate: true,
            yaw_or_rate: degrees_per_sec,
        }
    }
}

impl Default for YawMode {
    fn default() -> Self {
        Self::rate(0.0)
    }
}

/// 速度指令（世界坐标系）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityCommand {
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    pub duration: Duration,
    pub drivetrain: DrivetrainType,
    pub yaw_mode: YawMode,
}

impl VelocityCommand {
    /// 以固定航向锁定的速度指令（MaxDegreeOfFreedom）
    pub fn holding_heading(velocity: Vector3r, duration: Duration, heading_deg: f64) -> Self {
        Self {
            vx: velocity.x,
            vy: velocity.y,
            vz: velocity.z,
            duration,
            drivetrain: DrivetrainType::MaxDegreeOfFreedom,
            yaw_mode: YawMode::angle(heading_deg),
        }
    }

    pub fn velocity(&self) -> Vector3r {
        Vector3r::new(self.vx, self.vy, self.vz)
    }
}

/// 位置指令
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionCommand {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub velocity: f64,
    /// 秒；AirSim 默认 3e38（实际上无超时），超出 `Duration` 范围，因此保留 f64
    pub timeout_sec: f64,
    pub drivetrain: DrivetrainType,
    pub yaw_mode: YawMode,
    pub lookahead: f64,
    pub adaptive_lookahead: f64,
}

impl PositionCommand {
    /// 使用 AirSim 默认参数的位置指令
    pub fn new(x: f64, y: f64, z: f64, velocity: f64) -> Self {
        Self {
            x,
            y,
            z,
            velocity,
            timeout_sec: 3e38,
            drivetrain: DrivetrainType::MaxDegreeOfFreedom,
            yaw_mode: YawMode::default(),
            lookahead: -1.0,
            adaptive_lookahead: 1.0,
        }
    }

    pub fn target(&self) -> Vector3r {
        Vector3r::new(self.x, self.y, self.z)
    }
}
