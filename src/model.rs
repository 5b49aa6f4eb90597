// 该文件是 Shanlan （山岚） 项目的一部分。
// src/model.rs - 推理引擎抽象
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use url::Url;

use crate::tensor::{EncodedBuffer, InputTensorSpec};

/// 推理引擎
///
/// 具体实现是对某个本地推理库的适配。`input_spec` 只能在模型加载之后调用；
/// 同一实例上的 `run` 由 [`Classifier`] 串行化。
pub trait InferenceEngine {
  type Error: std::error::Error + Send + Sync + 'static;

  fn input_spec(&self) -> Result<InputTensorSpec, Self::Error>;

  /// 返回每个类别一个置信度，顺序与标签表一致
  fn run(&self, input: &EncodedBuffer) -> Result<Vec<f32>, Self::Error>;
}

/// 从模型字节创建推理引擎
pub trait EngineLoader {
  type Engine: InferenceEngine;
  type Error: std::error::Error + Send + Sync + 'static;

  fn load(&self, model: Vec<u8>, options: &EngineOptions) -> Result<Self::Engine, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
  pub num_threads: usize,
}

impl Default for EngineOptions {
  fn default() -> Self {
    Self { num_threads: 1 }
  }
}

/// 预处理参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessConfig {
  pub mean: f32,
  pub std: f32,
  pub maintain_aspect_ratio: bool,
}

impl Default for PreprocessConfig {
  fn default() -> Self {
    Self {
      mean: 127.5,
      std: 127.5,
      maintain_aspect_ratio: false,
    }
  }
}

impl PreprocessConfig {
  /// 从 `?mean=..&std=..&keep_aspect` 读取参数
  pub fn from_query(url: &Url) -> Self {
    let mut config = Self::default();
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "mean" => {
          if let Ok(m) = v.parse() {
            config.mean = m;
          }
        }
        "std" => {
          if let Ok(s) = v.parse() {
            config.std = s;
          }
        }
        "keep_aspect" => {
          config.maintain_aspect_ratio = v.is_empty() || v == "true" || v == "1";
        }
        _ => {}
      }
    }
    config
  }
}

mod classifier;
pub use self::classifier::{Classifier, ClassifierBuilder, ClassifyError, SetupError};
