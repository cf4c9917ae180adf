//! 共享日志输出
//!
//! 控制线程与遥测线程写入同一个目标，每条记录一行（或多行正文）：
//!
//! ```text
//! 2026-10-16T08:30:01.123456Z - teleop - INFO - Command received: Move Forward
//! ```
//!
//! `LogSink` 是对 `tracing::Dispatch` 的可克隆句柄。写入通过
//! `dispatcher::with_default` 定向到本 sink，因此多个 sink（例如测试中的内存 sink）
//! 可以在同一进程内共存。

use parking_lot::Mutex;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{Dispatch, Event, Level, Subscriber, dispatcher};
pub use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::registry::LookupSpan;

/// 默认来源名
pub const DEFAULT_SOURCE: &str = "teleop";

/// `timestamp - source - LEVEL - message`
#[derive(Debug, Clone)]
pub struct RecordFormat {
    source: Arc<str>,
}

impl RecordFormat {
    pub fn new(source: &str) -> Self {
        Self {
            source: Arc::from(source),
        }
    }
}

impl<S, N> FormatEvent<S, N> for RecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        SystemTime.format_time(&mut writer)?;
        write!(
            writer,
            " - {} - {} - ",
            self.source,
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// 日志输出句柄
#[derive(Clone, Debug)]
pub struct LogSink {
    dispatch: Dispatch,
    source: Arc<str>,
}

impl LogSink {
    /// 写入任意 `MakeWriter`
    pub fn from_writer<W>(writer: W, source: &str) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let format = RecordFormat::new(source);
        let source = format.source.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer)
            .with_ansi(false)
            .with_max_level(Level::INFO)
            .event_format(format)
            .finish();

        Self {
            dispatch: Dispatch::new(subscriber),
            source,
        }
    }

    /// 写入文件（每次会话覆盖）
    ///
    /// 返回的 `WorkerGuard` 在 drop 时刷新后台写线程，需持有到会话结束。
    pub fn file(path: impl AsRef<Path>, source: &str) -> io::Result<(Self, WorkerGuard)> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let (writer, guard) = tracing_appender::non_blocking(file);

        let sink = Self::from_writer(writer, source);
        sink.info("Logging initiated");
        Ok((sink, guard))
    }

    /// 写入内存（测试用）
    pub fn in_memory(source: &str) -> (Self, MemoryLog) {
        let log = MemoryLog::default();
        (Self::from_writer(log.clone(), source), log)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 底层 dispatch（用于设置为全局默认）
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn info(&self, message: impl fmt::Display) {
        dispatcher::with_default(&self.dispatch, || tracing::info!("{}", message));
    }

    pub fn warn(&self, message: impl fmt::Display) {
        dispatcher::with_default(&self.dispatch, || tracing::warn!("{}", message));
    }

    pub fn error(&self, message: impl fmt::Display) {
        dispatcher::with_default(&self.dispatch, || tracing::error!("{}", message));
    }
}

/// 内存日志：每个事件一条记录（不含结尾换行）
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    records: Arc<Mutex<Vec<String>>>,
}

impl MemoryLog {
    pub fn records(&self) -> Vec<String> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// 包含 `needle` 的记录数
    pub fn count_containing(&self, needle: &str) -> usize {
        self.records
            .lock()
            .iter()
            .filter(|r| r.contains(needle))
            .count()
    }
}

/// 单个事件的写入缓冲，drop 时提交为一条记录
pub struct MemoryLogWriter {
    buf: Vec<u8>,
    records: Arc<Mutex<Vec<String>>>,
}

impl io::Write for MemoryLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemoryLogWriter {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        self.records
            .lock()
            .push(text.trim_end_matches('\n').to_string());
    }
}

impl<'a> MakeWriter<'a> for MemoryLog {
    type Writer = MemoryLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        MemoryLogWriter {
            buf: Vec::new(),
            records: self.records.clone(),
        }
    }
}
