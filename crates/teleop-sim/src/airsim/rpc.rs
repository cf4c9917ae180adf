//! msgpack-rpc 编解码与响应路由
//!
//! - 请求：`[0, msgid, method, params]`
//! - 响应：`[1, msgid, error, result]`
//!
//! 接收线程按 msgid 将响应投递给等待方；没有等待方（发后不管）的响应直接丢弃。

use crate::completion::Reply;
use crate::error::SimError;
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use rmpv::Value;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, warn};

const REQUEST: u64 = 0;
const RESPONSE: u64 = 1;

/// 编码一个请求帧
pub(crate) fn encode_request(
    msgid: u32,
    method: &str,
    params: Vec<Value>,
) -> Result<Vec<u8>, SimError> {
    let request = Value::Array(vec![
        Value::from(REQUEST),
        Value::from(msgid),
        Value::from(method),
        Value::Array(params),
    ]);

    let mut buf = Vec::with_capacity(64);
    rmpv::encode::write_value(&mut buf, &request).map_err(|e| SimError::Codec(e.to_string()))?;
    Ok(buf)
}

/// 解析后的响应
#[derive(Debug)]
pub(crate) struct Response {
    pub msgid: u32,
    /// `Err` 为模拟器返回的错误描述
    pub result: Result<Value, String>,
}

impl Response {
    pub(crate) fn parse(value: Value) -> Result<Self, SimError> {
        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(SimError::UnexpectedResponse(format!(
                    "expected array, got {}",
                    other
                )));
            },
        };

        let [kind, msgid, error, result]: [Value; 4] = items.try_into().map_err(|items: Vec<Value>| {
            SimError::UnexpectedResponse(format!("expected 4 elements, got {}", items.len()))
        })?;

        if kind.as_u64() != Some(RESPONSE) {
            return Err(SimError::UnexpectedResponse(format!(
                "expected response type {}, got {}",
                RESPONSE, kind
            )));
        }

        let msgid = msgid
            .as_u64()
            .and_then(|id| u32::try_from(id).ok())
            .ok_or_else(|| SimError::UnexpectedResponse(format!("invalid msgid {}", msgid)))?;

        let result = if error.is_nil() {
            Ok(result)
        } else {
            Err(error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string()))
        };

        Ok(Self { msgid, result })
    }
}

/// 等待响应的调用表
#[derive(Default)]
pub(crate) struct PendingCalls {
    waiters: Mutex<HashMap<u32, (&'static str, Sender<Reply>)>>,
}

impl PendingCalls {
    pub(crate) fn register(&self, msgid: u32, method: &'static str, tx: Sender<Reply>) {
        self.waiters.lock().insert(msgid, (method, tx));
    }

    pub(crate) fn cancel(&self, msgid: u32) {
        self.waiters.lock().remove(&msgid);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub(crate) fn complete(&self, response: Response) {
        let waiter = self.waiters.lock().remove(&response.msgid);
        let Some((method, tx)) = waiter else {
            debug!("Dropping response for untracked msgid {}", response.msgid);
            return;
        };

        let reply = response.result.map_err(|message| SimError::Rpc {
            method: method.to_string(),
            message,
        });

        // 调用方已丢弃 Completion（发后不管）时发送失败；失败结果仍留一条诊断日志
        if let Err(unsent) = tx.send(reply)
            && let Err(e) = unsent.into_inner()
        {
            warn!("`{}` failed after caller stopped waiting: {}", method, e);
        }
    }

    /// 连接断开：所有等待方收到 `Disconnected`
    pub(crate) fn fail_all(&self) {
        let drained: Vec<_> = self.waiters.lock().drain().collect();
        for (_, (_, tx)) in drained {
            let _ = tx.send(Err(SimError::Disconnected));
        }
    }
}

/// 接收线程主循环
///
/// 读取失败（对端关闭、socket 被 shutdown）时退出，并清空调用表。
pub(crate) fn receive_loop<R: Read>(
    mut reader: R,
    pending: Arc<PendingCalls>,
    is_running: Arc<AtomicBool>,
) {
    while is_running.load(Ordering::Acquire) {
        let value = match rmpv::decode::read_value(&mut reader) {
            Ok(value) => value,
            Err(e) => {
                if is_running.load(Ordering::Acquire) {
                    error!("RPC receive error: {}", e);
                }
                break;
            },
        };

        match Response::parse(value) {
            Ok(response) => pending.complete(response),
            Err(e) => warn!("Ignoring malformed RPC message: {}", e),
        }
    }

    is_running.store(false, Ordering::Release);
    pending.fail_all();
    debug!("RPC receive loop exited");
}
