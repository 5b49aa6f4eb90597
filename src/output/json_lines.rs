// 该文件是 Shanlan （山岚） 项目的一部分。
// src/output/json_lines.rs - JSON Lines 记录输出
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
  fs::OpenOptions,
  io::Write,
  path::{Path, PathBuf},
  sync::{Arc, Mutex, PoisonError},
};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, frame::ArgbImage, output::Render, rank::ClassificationResult,
  url_path,
};

#[derive(Error, Debug)]
pub enum JsonLinesError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerdeError(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct Record<'a> {
  frame: u64,
  timestamp: String,
  width: u32,
  height: u32,
  results: &'a [ClassificationResult],
}

/// 每次分类追加一行 JSON 记录
///
/// `?always` 未设置时跳过空结果。
#[derive(Debug)]
pub struct JsonLinesOutput {
  path: PathBuf,
  frame_counter: Arc<Mutex<u64>>,
  always: bool,
}

impl FromUrlWithScheme for JsonLinesOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonLinesOutput {
  type Error = JsonLinesError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(JsonLinesError::SchemeMismatch);
    }

    let always = url.query_pairs().any(|(k, _)| k == "always");
    Ok(Self::new(url_path(url), always))
  }
}

impl JsonLinesOutput {
  pub fn new(path: impl Into<PathBuf>, always: bool) -> Self {
    Self {
      path: path.into(),
      frame_counter: Arc::new(Mutex::new(0)),
      always,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn next_frame(&self) -> u64 {
    let mut counter = self
      .frame_counter
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    *counter += 1;
    *counter
  }
}

impl Render<ArgbImage, Vec<ClassificationResult>> for JsonLinesOutput {
  type Error = JsonLinesError;

  fn render_result(
    &self,
    frame: &ArgbImage,
    result: &Vec<ClassificationResult>,
  ) -> Result<(), Self::Error> {
    let index = self.next_frame();
    if !self.always && result.is_empty() {
      return Ok(());
    }

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    let record = Record {
      frame: index,
      timestamp: Utc::now().to_rfc3339(),
      width: frame.width(),
      height: frame.height(),
      results: result,
    };
    let mut line = serde_json::to_string(&record)?;
    line.push('\n');

    let mut file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&self.path)?;
    file.write_all(line.as_bytes())?;
    debug!("写入记录 {} 到 {}", index, self.path.display());

    Ok(())
  }
}
