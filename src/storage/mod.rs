// src/storage/mod.rs
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::structs::{Collection, Record};

/// 以单个 JSON 文件保存整个集合；每次读写都是整份文档
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        tracing::debug!(path = %path.display(), "RecordStore initialized");
        RecordStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取并解析整个文件。缺失、读失败、解析失败都向上返回错误。
    pub fn load(&self) -> Result<Collection> {
        let bytes = fs::read(&self.path).map_err(|e| Error::io(&self.path, e))?;
        let document: Value = serde_json::from_slice(&bytes).map_err(|source| Error::Parse {
            path: self.path.clone(),
            source,
        })?;

        let Value::Array(items) = document else {
            return Err(self.invalid("top-level value is not an array"));
        };

        let mut collection = Collection::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(record) => collection.push(record),
                _ => return Err(self.invalid(format!("element {} is not an object", index))),
            }
        }
        tracing::trace!(path = %self.path.display(), records = collection.len(), "collection loaded");
        Ok(collection)
    }

    /// 覆盖写入整个集合：先写同目录下唯一命名的临时文件并 fsync，再 rename 替换目标
    pub fn save(&self, collection: &[Record]) -> Result<()> {
        let serialized = serde_json::to_string_pretty(collection)?;

        let dir = self.parent_dir();
        let mut temp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        // 出错时 NamedTempFile 在 drop 时自行删除
        let written = temp
            .write_all(serialized.as_bytes())
            .and_then(|()| temp.flush())
            .and_then(|()| temp.as_file().sync_all());
        written.map_err(|e| Error::io(temp.path(), e))?;

        temp.persist(&self.path)
            .map_err(|e| Error::io(&self.path, e.error))?;
        tracing::trace!(path = %self.path.display(), records = collection.len(), "collection saved");
        Ok(())
    }

    /// 文件不存在时创建父目录并写入空数组；返回是否新建
    pub fn init_if_missing(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        self.save(&[])?;
        tracing::info!(path = %self.path.display(), "created empty data file");
        Ok(true)
    }

    fn parent_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::InvalidDocument {
            path: self.path.clone(),
            message: message.into(),
        }
    }
}
