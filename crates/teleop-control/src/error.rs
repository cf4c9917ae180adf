//! 错误类型定义

use crate::action::ActionKind;
use teleop_sim::SimError;
use thiserror::Error;

/// 指令分发错误
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{action} command failed: {source}")]
    Simulator {
        action: ActionKind,
        #[source]
        source: SimError,
    },
}

impl DispatchError {
    pub fn action(&self) -> ActionKind {
        match self {
            DispatchError::Simulator { action, .. } => *action,
        }
    }
}

/// 按键输入错误
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Input IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input source closed")]
    Closed,

    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Action `{0}` cannot be bound to a key")]
    Unbindable(ActionKind),

    #[error("Key `{0}` is reserved for exit")]
    ReservedKey(String),
}

/// 会话错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Connection setup failed after {attempts} attempt(s): {source}")]
    Connect {
        attempts: u32,
        #[source]
        source: SimError,
    },

    #[error("Failed to spawn {0} thread: {1}")]
    Spawn(&'static str, #[source] std::io::Error),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("{0} thread panicked")]
    Panicked(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_error_display() {
        let err = DispatchError::Simulator {
            action: ActionKind::Hover,
            source: SimError::Timeout,
        };
        assert_eq!(err.to_string(), "hover command failed: Operation timeout");
        assert_eq!(err.action(), ActionKind::Hover);
    }

    #[test]
    fn test_session_error_display() {
        let err = SessionError::Connect {
            attempts: 3,
            source: SimError::Disconnected,
        };
        assert!(err.to_string().contains("after 3 attempt(s)"));

        let err: SessionError = InputError::Closed.into();
        assert_eq!(err.to_string(), "Input source closed");

        assert_eq!(
            SessionError::Panicked("control").to_string(),
            "control thread panicked"
        );
    }

    #[test]
    fn test_input_error_display() {
        assert_eq!(
            InputError::Unbindable(ActionKind::Goto).to_string(),
            "Action `goto` cannot be bound to a key"
        );
        assert_eq!(
            InputError::UnknownKey("f13".into()).to_string(),
            "Unknown key: f13"
        );
    }
}
