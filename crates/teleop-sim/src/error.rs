//! 模拟器层错误类型定义

use thiserror::Error;

/// 模拟器调用错误
#[derive(Error, Debug)]
pub enum SimError {
    /// 网络 IO 错误（连接、读写）
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// msgpack 编解码错误
    #[error("Codec error: {0}")]
    Codec(String),

    /// 模拟器返回的 RPC 错误
    #[error("RPC `{method}` failed: {message}")]
    Rpc { method: String, message: String },

    /// 响应格式不符合 msgpack-rpc 约定
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// 连接已断开（接收线程退出）
    #[error("Simulator disconnected")]
    Disconnected,

    /// 等待响应超时
    #[error("Operation timeout")]
    Timeout,

    /// 飞行器未处于可接受指令的状态（未连接/未启用 API 控制/未解锁）
    #[error("Vehicle not ready: {0}")]
    NotReady(String),

    /// 指令被拒绝
    #[error("Command rejected: {0}")]
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::SimError;

    #[test]
    fn test_sim_error_display() {
        let err = SimError::Rpc {
            method: "moveByVelocity".to_string(),
            message: "vehicle not armed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "RPC `moveByVelocity` failed: vehicle not armed"
        );

        assert_eq!(SimError::Disconnected.to_string(), "Simulator disconnected");
        assert_eq!(SimError::Timeout.to_string(), "Operation timeout");

        let err = SimError::NotReady("api control disabled".to_string());
        assert!(err.to_string().contains("api control disabled"));
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: SimError = io.into();
        assert!(matches!(err, SimError::Io(_)));
    }
}
