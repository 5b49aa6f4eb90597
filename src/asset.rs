// 该文件是 Shanlan （山岚） 项目的一部分。
// src/asset.rs - 资源读取
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{
  collections::HashMap,
  io::ErrorKind,
  path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, url_path};

#[derive(Error, Debug)]
pub enum AssetError {
  #[error("资源不存在: {0}")]
  NotFound(String),
  #[error("读取资源 {path} 失败: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },
  #[error("资源 {0} 不是有效的 UTF-8 文本")]
  InvalidUtf8(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 模型与标签的来源
pub trait AssetSource {
  fn read_bytes(&self, path: &str) -> Result<Vec<u8>, AssetError>;

  /// 按行读取 UTF-8 文本
  fn read_text(&self, path: &str) -> Result<Vec<String>, AssetError> {
    let bytes = self.read_bytes(path)?;
    let text = String::from_utf8(bytes).map_err(|_| AssetError::InvalidUtf8(path.to_string()))?;
    Ok(text.lines().map(str::to_string).collect())
  }
}

impl<T: AssetSource + ?Sized> AssetSource for &T {
  fn read_bytes(&self, path: &str) -> Result<Vec<u8>, AssetError> {
    (**self).read_bytes(path)
  }

  fn read_text(&self, path: &str) -> Result<Vec<String>, AssetError> {
    (**self).read_text(path)
  }
}

/// 以某个目录为根的文件系统资源
#[derive(Debug, Clone)]
pub struct FsAssetSource {
  root: PathBuf,
}

impl FsAssetSource {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn resolve(&self, path: &str) -> PathBuf {
    self.root.join(path.trim_start_matches("file://"))
  }
}

impl FromUrlWithScheme for FsAssetSource {
  const SCHEME: &'static str = "asset";
}

impl FromUrl for FsAssetSource {
  type Error = AssetError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(AssetError::SchemeMismatch(url.scheme().to_string()));
    }

    Ok(FsAssetSource::new(url_path(url)))
  }
}

impl AssetSource for FsAssetSource {
  fn read_bytes(&self, path: &str) -> Result<Vec<u8>, AssetError> {
    let full = self.resolve(path);
    debug!("读取资源: {}", full.display());
    std::fs::read(&full).map_err(|source| {
      if source.kind() == ErrorKind::NotFound {
        AssetError::NotFound(full.display().to_string())
      } else {
        AssetError::Io {
          path: full.display().to_string(),
          source,
        }
      }
    })
  }
}

/// 内存中的资源表，用于内嵌资源
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
  entries: HashMap<String, Vec<u8>>,
}

impl MemoryAssetSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
    self.entries.insert(path.into(), data.into());
    self
  }
}

impl AssetSource for MemoryAssetSource {
  fn read_bytes(&self, path: &str) -> Result<Vec<u8>, AssetError> {
    self
      .entries
      .get(path)
      .cloned()
      .ok_or_else(|| AssetError::NotFound(path.to_string()))
  }
}
