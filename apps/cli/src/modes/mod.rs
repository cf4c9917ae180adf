//! 运行模式
//!
//! - `interactive` - 键盘遥控会话（默认）
//! - `oneshot` - 单条指令（takeoff / goto / rc）

pub mod interactive;
pub mod oneshot;
