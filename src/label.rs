// 该文件是 Shanlan （山岚） 项目的一部分。
// src/label.rs - 标签表
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

use thiserror::Error;
use tracing::{error, info};

use crate::asset::{AssetError, AssetSource};

/// 越界查询时返回的标签
pub const UNKNOWN_LABEL: &str = "unknown";

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("读取标签文件 {path} 失败: {source}")]
  Load {
    path: String,
    #[source]
    source: AssetError,
  },
  #[error("标签文件 {0} 为空")]
  Empty(String),
}

/// 有序标签表，第 i 个标签对应输出向量第 i 个位置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelStore {
  labels: Box<[String]>,
}

impl LabelStore {
  /// 从按行排列的标签构造，忽略末尾的空行
  pub fn from_lines<I, S>(lines: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut labels: Vec<String> = lines.into_iter().map(Into::into).collect();
    while labels.last().is_some_and(|l| l.trim().is_empty()) {
      labels.pop();
    }
    Self {
      labels: labels.into_boxed_slice(),
    }
  }

  pub fn from_text(text: &str) -> Self {
    Self::from_lines(text.lines())
  }

  /// 通过资源源读取标签文件
  pub fn load<A: AssetSource + ?Sized>(assets: &A, path: &str) -> Result<Self, LabelError> {
    info!("加载标签文件: {}", path);
    let lines = assets.read_text(path).map_err(|source| {
      error!("读取标签文件失败: {}", source);
      LabelError::Load {
        path: path.to_string(),
        source,
      }
    })?;

    let store = Self::from_lines(lines);
    if store.is_empty() {
      error!("标签文件为空: {}", path);
      return Err(LabelError::Empty(path.to_string()));
    }

    info!("共加载 {} 个标签", store.len());
    Ok(store)
  }

  /// 越界时返回 `"unknown"`
  pub fn get(&self, index: usize) -> &str {
    self
      .labels
      .get(index)
      .map(String::as_str)
      .unwrap_or(UNKNOWN_LABEL)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}
