//! 个人偏好档案：读取 JSON 文件，作为「出行灵感」生成的上下文

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("The file {} does not exist.", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode JSON in {}, please check the file format: {source}", path.display())]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 读取偏好文件并解析为 JSON
pub fn read_profile(path: impl AsRef<Path>) -> Result<Value, ProfileError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ProfileError::NotFound(path.to_path_buf()),
        _ => ProfileError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    let value = serde_json::from_str(&text).map_err(|e| ProfileError::InvalidJson {
        path: path.to_path_buf(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), "profile loaded");
    Ok(value)
}
