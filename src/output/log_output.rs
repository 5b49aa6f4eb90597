// 该文件是 Shanlan （山岚） 项目的一部分。
// src/output/log_output.rs - 日志输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;

use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, frame::ArgbImage, output::Render, rank::ClassificationResult,
};

/// 通过 tracing 打印分类结果
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOutput;

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = Infallible;

  fn from_url(_url: &Url) -> Result<Self, Self::Error> {
    Ok(LogOutput)
  }
}

impl Render<ArgbImage, Vec<ClassificationResult>> for LogOutput {
  type Error = Infallible;

  fn render_result(
    &self,
    frame: &ArgbImage,
    result: &Vec<ClassificationResult>,
  ) -> Result<(), Self::Error> {
    info!(
      "图像 {}x{}: {} 个分类结果",
      frame.width(),
      frame.height(),
      result.len()
    );
    for item in result {
      info!(
        "  - [{}] {}: {:.2}%",
        item.class_index,
        item.label,
        item.confidence * 100.0
      );
    }
    Ok(())
  }
}
