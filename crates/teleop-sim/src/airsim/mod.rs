//! AirSim msgpack-RPC 客户端
//!
//! 单个 TCP 连接 + 独立接收线程：
//! - 发送：`Mutex<TcpStream>` 保证每个请求帧整体写出
//! - 接收：`airsim-rx` 线程解码响应并按 msgid 投递
//!
//! 因此同一个 `AirSimClient` 可以被多个线程并发调用。

mod rpc;

use crate::completion::{Completion, Reply};
use crate::error::SimError;
use crate::types::*;
use crate::Simulator;
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use parking_lot::Mutex;
use rmpv::Value;
use rpc::{PendingCalls, encode_request, receive_loop};
use serde::de::DeserializeOwned;
use std::io::{self, BufReader, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// AirSim 默认 RPC 端口
pub const DEFAULT_PORT: u16 = 41451;

/// 连接配置
#[derive(Debug, Clone)]
pub struct AirSimConfig {
    pub host: String,
    pub port: u16,
    /// 飞行器名称（空字符串表示默认飞行器）
    pub vehicle_name: String,
    pub connect_timeout: Duration,
    /// 同步调用（状态查询等）的等待上限，`None` 表示一直等待
    pub call_timeout: Option<Duration>,
}

impl Default for AirSimConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            vehicle_name: String::new(),
            connect_timeout: Duration::from_secs(5),
            call_timeout: None,
        }
    }
}

/// AirSim 客户端
pub struct AirSimClient {
    writer: Mutex<TcpStream>,
    pending: Arc<PendingCalls>,
    next_msgid: AtomicU32,
    is_running: Arc<AtomicBool>,
    rx_thread: Option<JoinHandle<()>>,
    vehicle_name: String,
    call_timeout: Option<Duration>,
}

impl AirSimClient {
    /// 建立 TCP 连接并启动接收线程
    pub fn connect(config: &AirSimConfig) -> Result<Self, SimError> {
        let addr = (config.host.as_str(), config.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("cannot resolve {}:{}", config.host, config.port),
                )
            })?;

        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout)?;
        stream.set_nodelay(true)?;
        let reader = stream.try_clone()?;

        let pending = Arc::new(PendingCalls::default());
        let is_running = Arc::new(AtomicBool::new(true));

        let rx_thread = thread::Builder::new().name("airsim-rx".to_string()).spawn({
            let pending = pending.clone();
            let is_running = is_running.clone();
            move || receive_loop(BufReader::new(reader), pending, is_running)
        })?;

        info!("Connected to AirSim at {}", addr);

        Ok(Self {
            writer: Mutex::new(stream),
            pending,
            next_msgid: AtomicU32::new(0),
            is_running,
            rx_thread: Some(rx_thread),
            vehicle_name: config.vehicle_name.clone(),
            call_timeout: config.call_timeout,
        })
    }

    /// 接收线程是否仍在运行
    pub fn is_connected(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    fn send(&self, method: &'static str, params: Vec<Value>) -> Result<Receiver<Reply>, SimError> {
        if !self.is_connected() {
            return Err(SimError::Disconnected);
        }

        let msgid = self.next_msgid.fetch_add(1, Ordering::Relaxed);
        let frame = encode_request(msgid, method, params)?;

        let (tx, rx) = bounded(1);
        self.pending.register(msgid, method, tx);

        let written = {
            let mut writer = self.writer.lock();
            writer.write_all(&frame).and_then(|_| writer.flush())
        };
        if let Err(e) = written {
            self.pending.cancel(msgid);
            return Err(e.into());
        }

        // 接收线程可能在注册之后才清空调用表
        if !self.is_connected() {
            self.pending.cancel(msgid);
            return Err(SimError::Disconnected);
        }

        debug!("RPC -> {} (msgid {})", method, msgid);
        Ok(rx)
    }

    fn call(&self, method: &'static str, params: Vec<Value>) -> Result<Value, SimError> {
        let rx = self.send(method, params)?;
        match self.call_timeout {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(reply) => reply,
                Err(RecvTimeoutError::Timeout) => Err(SimError::Timeout),
                Err(RecvTimeoutError::Disconnected) => Err(SimError::Disconnected),
            },
            None => rx.recv().map_err(|_| SimError::Disconnected)?,
        }
    }

    fn call_async(&self, method: &'static str, params: Vec<Value>) -> Result<Completion, SimError> {
        Ok(Completion::pending(method, self.send(method, params)?))
    }

    fn vehicle(&self) -> Value {
        Value::from(self.vehicle_name.as_str())
    }
}

impl Drop for AirSimClient {
    fn drop(&mut self) {
        self.is_running.store(false, Ordering::Release);
        // shutdown 让阻塞在 read 上的接收线程立即返回
        let _ = self.writer.lock().shutdown(Shutdown::Both);
        if let Some(handle) = self.rx_thread.take()
            && handle.join().is_err()
        {
            warn!("AirSim RX thread panicked");
        }
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T, SimError> {
    rmpv::ext::from_value(value).map_err(|e| SimError::Codec(format!("{}: {}", method, e)))
}

fn yaw_mode_value(mode: &YawMode) -> Value {
    Value::Map(vec![
        (Value::from("is_rate"), Value::from(mode.is_rate)),
        (Value::from("yaw_or_rate"), Value::from(mode.yaw_or_rate)),
    ])
}

impl Simulator for AirSimClient {
    fn confirm_connection(&self) -> Result<(), SimError> {
        let pong = self.call("ping", vec![])?;
        match pong.as_bool() {
            Some(true) => Ok(()),
            _ => Err(SimError::UnexpectedResponse(format!("ping returned {}", pong))),
        }
    }

    fn reset(&self) -> Result<(), SimError> {
        self.call("reset", vec![]).map(|_| ())
    }

    fn enable_api_control(&self, enabled: bool) -> Result<(), SimError> {
        self.call("enableApiControl", vec![Value::from(enabled), self.vehicle()])
            .map(|_| ())
    }

    fn arm_disarm(&self, arm: bool) -> Result<bool, SimError> {
        let accepted = self.call("armDisarm", vec![Value::from(arm), self.vehicle()])?;
        Ok(accepted.as_bool().unwrap_or(false))
    }

    fn move_by_velocity(&self, command: &VelocityCommand) -> Result<Completion, SimError> {
        self.call_async(
            "moveByVelocity",
            vec![
                Value::from(command.vx),
                Value::from(command.vy),
                Value::from(command.vz),
                Value::from(command.duration.as_secs_f64()),
                Value::from(command.drivetrain.as_u8()),
                yaw_mode_value(&command.yaw_mode),
                self.vehicle(),
            ],
        )
    }

    fn move_to_position(&self, command: &PositionCommand) -> Result<Completion, SimError> {
        self.call_async(
            "moveToPosition",
            vec![
                Value::from(command.x),
                Value::from(command.y),
                Value::from(command.z),
                Value::from(command.velocity),
                Value::from(command.timeout_sec),
                Value::from(command.drivetrain.as_u8()),
                yaw_mode_value(&command.yaw_mode),
                Value::from(command.lookahead),
                Value::from(command.adaptive_lookahead),
                self.vehicle(),
            ],
        )
    }

    fn hover(&self) -> Result<Completion, SimError> {
        self.call_async("hover", vec![self.vehicle()])
    }

    fn takeoff(&self, timeout: Duration) -> Result<Completion, SimError> {
        self.call_async(
            "takeoff",
            vec![Value::from(timeout.as_secs_f64()), self.vehicle()],
        )
    }

    fn multirotor_state(&self) -> Result<MultirotorState, SimError> {
        let value = self.call("getMultirotorState", vec![self.vehicle()])?;
        decode("getMultirotorState", value)
    }

    fn collision_info(&self) -> Result<CollisionInfo, SimError> {
        let value = self.call("simGetCollisionInfo", vec![self.vehicle()])?;
        decode("simGetCollisionInfo", value)
    }
}
