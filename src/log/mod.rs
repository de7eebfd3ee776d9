// src/log/mod.rs

// 请求日志：每个完成的请求追加一行 `operation,method,status,timestamp`
// 处理器只负责投递，由单独的写入任务落盘，写失败只打 warn，不影响响应

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::structs::LogEntry;

/// Where request log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    File(PathBuf),
    Console,
    Disabled,
}

/// Cloneable handle used by request handlers.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    sender: Option<UnboundedSender<LogEntry>>,
}

/// Owns the writer task; `finish` drains it.
#[derive(Debug)]
pub struct LogWriterHandle {
    task: Option<JoinHandle<()>>,
}

impl RequestLogger {
    /// Must be called inside a tokio runtime.
    pub fn spawn(sink: LogSink) -> (RequestLogger, LogWriterHandle) {
        if sink == LogSink::Disabled {
            return (RequestLogger { sender: None }, LogWriterHandle { task: None });
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(write_loop(sink, receiver));
        (
            RequestLogger {
                sender: Some(sender),
            },
            LogWriterHandle { task: Some(task) },
        )
    }

    /// 投递后立即返回，从不失败
    pub fn record(&self, entry: LogEntry) {
        let Some(sender) = &self.sender else {
            return;
        };
        if let Err(e) = sender.send(entry) {
            tracing::warn!(entry = ?e.0, "request log writer is gone, entry dropped");
        }
    }
}

impl LogWriterHandle {
    /// Waits until every queued entry is written. Returns only after all
    /// `RequestLogger` clones have been dropped.
    pub async fn finish(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "request log writer task failed");
            }
        }
    }
}

enum Writer {
    File(PathBuf),
    Console(Stdout),
}

async fn write_loop(sink: LogSink, mut receiver: UnboundedReceiver<LogEntry>) {
    let mut writer = match sink {
        LogSink::File(path) => Writer::File(path),
        LogSink::Console => Writer::Console(tokio::io::stdout()),
        LogSink::Disabled => return,
    };

    while let Some(entry) = receiver.recv().await {
        let line = entry.to_line();
        let result = match &mut writer {
            // 每行单独以 append 打开，文件被移走后会重新创建
            Writer::File(path) => append_line(path, &line).await,
            Writer::Console(stdout) => {
                let written = stdout.write_all(line.as_bytes()).await;
                match written {
                    Ok(()) => stdout.flush().await,
                    Err(e) => Err(e),
                }
            }
        };
        match result {
            Ok(()) => tracing::trace!(line = line.trim_end(), "request logged"),
            Err(e) => tracing::warn!(error = %e, "failed to write request log entry"),
        }
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}
