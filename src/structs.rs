use chrono::{DateTime, Local};
use serde_json::{Map, Value};
use std::fmt;

// --- Data Structures ---

/// 一条记录：至少带数值 `id` 的 JSON 对象，其余字段原样透传
pub type Record = Map<String, Value>;

/// 整个数据文件：按插入顺序排列的记录数组
pub type Collection = Vec<Record>;

/// 记录标识字段名
pub const ID_FIELD: &str = "id";

/// The four collection operations, named as they appear in the request log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }

    /// Lower-case HTTP verb that triggers the operation.
    pub fn method(&self) -> &'static str {
        match self {
            Operation::Read => "get",
            Operation::Create => "post",
            Operation::Update => "put",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric record identifier parsed from a path segment.
///
/// Segments that are not a finite number parse to a selector that matches
/// nothing, so update/delete against them are silent no-ops.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordId(Option<f64>);

impl RecordId {
    pub fn parse(segment: &str) -> Self {
        let value = segment
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite());
        RecordId(value)
    }

    /// 不匹配任何记录的标识，用于无法解码的路径段
    pub fn unmatched() -> Self {
        RecordId(None)
    }

    #[cfg(test)]
    fn as_f64(&self) -> Option<f64> {
        self.0
    }

    /// 只有 `id` 为 JSON 数字且数值相等时才匹配
    pub fn matches(&self, record: &Record) -> bool {
        match (self.0, record.get(ID_FIELD).and_then(Value::as_f64)) {
            (Some(wanted), Some(actual)) => wanted == actual,
            _ => false,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => f.write_str("NaN"),
        }
    }
}

/// One completed request: (operation, method, status, timestamp).
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub operation: Operation,
    pub status: u16,
    pub timestamp: DateTime<Local>,
}

impl LogEntry {
    pub fn new(operation: Operation, status: u16) -> Self {
        LogEntry {
            operation,
            status,
            timestamp: Local::now(),
        }
    }

    /// `create,post,201,10/16/2026 8:38:05 AM`
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{}\n",
            self.operation.name(),
            self.operation.method(),
            self.status,
            self.timestamp.format("%-m/%-d/%Y %-I:%M:%S %p")
        )
    }
}
