// 该文件是 Shanlan （山岚） 项目的一部分。
// src/output.rs - 输出定义
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::ArgbImage, rank::ClassificationResult};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

mod log_output;
pub use self::log_output::LogOutput;

#[cfg(feature = "json_output")]
mod json_lines;
#[cfg(feature = "json_output")]
pub use self::json_lines::{JsonLinesError, JsonLinesOutput};

#[derive(Error, Debug)]
pub enum OutputError {
  #[cfg(feature = "json_output")]
  #[error("JSON 输出错误: {0}")]
  JsonLinesError(#[from] JsonLinesError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

#[derive(Debug)]
pub enum OutputWrapper {
  Log(LogOutput),
  #[cfg(feature = "json_output")]
  JsonLines(JsonLinesOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => Ok(OutputWrapper::Log(LogOutput)),
      #[cfg(feature = "json_output")]
      JsonLinesOutput::SCHEME => Ok(OutputWrapper::JsonLines(JsonLinesOutput::from_url(url)?)),
      _ => Err(OutputError::SchemeMismatch),
    }
  }
}

impl Render<ArgbImage, Vec<ClassificationResult>> for OutputWrapper {
  type Error = OutputError;

  fn render_result(
    &self,
    frame: &ArgbImage,
    result: &Vec<ClassificationResult>,
  ) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Log(output) => match output.render_result(frame, result) {
        Ok(()) => Ok(()),
        Err(never) => match never {},
      },
      #[cfg(feature = "json_output")]
      OutputWrapper::JsonLines(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}
