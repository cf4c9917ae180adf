//! 异步指令完成句柄
//!
//! 异步指令发出后立即返回 `Completion`：丢弃即“发后不管”，`join()` 则阻塞
//! 直到模拟器返回该请求的响应。

use crate::error::SimError;
use crossbeam_channel::Receiver;

/// 接收线程投递给等待方的结果
pub(crate) type Reply = Result<rmpv::Value, SimError>;

/// 异步指令的完成句柄
#[derive(Debug)]
pub struct Completion {
    state: State,
}

#[derive(Debug)]
enum State {
    /// 已完成（模拟实现或本地失败）
    Ready(Result<(), SimError>),
    /// 等待模拟器响应
    Pending {
        method: &'static str,
        rx: Receiver<Reply>,
    },
}

impl Completion {
    /// 已完成的句柄
    pub fn done() -> Self {
        Self {
            state: State::Ready(Ok(())),
        }
    }

    /// 已失败的句柄（`join()` 时返回该错误）
    pub fn failed(error: SimError) -> Self {
        Self {
            state: State::Ready(Err(error)),
        }
    }

    pub(crate) fn pending(method: &'static str, rx: Receiver<Reply>) -> Self {
        Self {
            state: State::Pending { method, rx },
        }
    }

    /// 是否已有结果（不阻塞）
    pub fn is_finished(&self) -> bool {
        match &self.state {
            State::Ready(_) => true,
            State::Pending { rx, .. } => !rx.is_empty(),
        }
    }

    /// 阻塞等待完成
    pub fn join(self) -> Result<(), SimError> {
        match self.state {
            State::Ready(result) => result,
            State::Pending { method, rx } => match rx.recv() {
                Ok(reply) => reply.map(|_| ()),
                Err(_) => {
                    tracing::debug!("Completion for `{}` lost: receiver side closed", method);
                    Err(SimError::Disconnected)
                },
            },
        }
    }
}
