//! # Teleop Control
//!
//! 键盘遥控到多旋翼速度指令的转换层，以及与之并发运行的遥测记录。
//!
//! ## 包含模块
//!
//! - `heading` - 累积航向（无回绕）与机体方向到世界坐标系的旋转
//! - `action` - 离散动作（前进/后退/转向/升降/悬停/起飞/定点）
//! - `dispatcher` - 指令分发器：持有航向状态，将动作转换为模拟器指令
//! - `bindings` - 按键绑定与阻塞式按键循环
//! - `telemetry` - 遥测记录线程
//! - `log_sink` - 共享日志输出（`timestamp - source - LEVEL - message`）
//! - `facade` - 四轴遥控接口（`send_rc_control`）适配
//! - `session` - 会话编排：建立连接、启动两个任务、按顺序关闭
//!
//! ## 线程模型
//!
//! ```text
//! Session ──┬── control 线程：KeySource → KeyBindings → Dispatcher ──┐
//!           │                                                        ├── Arc<dyn Simulator>
//!           └── telemetry 线程：TelemetryLogger（周期查询）──────────┘
//!                         两者共享同一个 LogSink
//! ```

pub mod action;
pub mod bindings;
pub mod dispatcher;
mod error;
pub mod facade;
pub mod heading;
pub mod log_sink;
pub mod metrics;
pub mod session;
mod stop;
pub mod telemetry;

pub use action::{Action, ActionKind, Magnitudes};
pub use bindings::{Key, KeyBindings, KeySource, ScriptedKeys, run_bindings};
pub use dispatcher::{CommandStatus, Dispatcher, ErrorPolicy};
pub use error::{DispatchError, InputError, SessionError};
pub use facade::RcFacade;
pub use heading::{Direction, Heading};
pub use log_sink::{LogSink, MemoryLog};
pub use metrics::{DispatchMetrics, DispatchSnapshot};
pub use session::{RetryPolicy, Session, SessionConfig, SessionReport, establish, prepare};
pub use stop::StopFlag;
pub use telemetry::{TelemetryLogger, TelemetryStats};

// 重新导出模拟器层，调用方无需单独依赖 teleop-sim
pub use teleop_sim as sim;
