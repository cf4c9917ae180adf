//! 命令定义和实现

pub mod config;
pub mod goto;
pub mod rc;

pub use config::ConfigCommand;
pub use goto::GotoCommand;
pub use rc::RcCommand;
