// 该文件是 Shanlan （山岚） 项目的一部分。
// src/model/classifier.rs - 分类流水线
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::{Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  asset::{AssetError, AssetSource},
  frame::ArgbImage,
  label::{LabelError, LabelStore},
  model::{EngineLoader, EngineOptions, InferenceEngine, PreprocessConfig},
  rank::{ClassificationResult, RankConfig, select_top_n},
  tensor::{EncodeError, EncodedBuffer, InputTensorSpec, encode},
  transform::{TransformError, TransformMatrix},
};

#[cfg(feature = "read_image_file")]
use crate::input::{ImageFileInputError, decode_image_file};

#[derive(Error, Debug)]
pub enum SetupError<E: std::error::Error + 'static> {
  #[error("标签加载错误: {0}")]
  Label(#[from] LabelError),
  #[error("模型读取错误: {0}")]
  Model(#[from] AssetError),
  #[error("推理引擎创建失败: {0}")]
  Engine(#[source] E),
}

#[derive(Error, Debug)]
pub enum ClassifyError<E: std::error::Error + 'static> {
  #[error("变换矩阵错误: {0}")]
  Transform(#[from] TransformError),
  #[error("张量编码错误: {0}")]
  Encode(#[from] EncodeError),
  #[cfg(feature = "read_image_file")]
  #[error("图像读取错误: {0}")]
  Input(#[from] ImageFileInputError),
  #[error("推理引擎错误: {0}")]
  Engine(#[source] E),
}

/// 模型与标签的加载器
///
/// 标签与模型要么同时加载成功，要么 [`ClassifierBuilder::build`] 返回错误，
/// 不会出现只有模型没有标签的 [`Classifier`]。
pub struct ClassifierBuilder<'a, A: AssetSource + ?Sized> {
  assets: &'a A,
  model_path: String,
  labels_path: String,
  options: EngineOptions,
}

impl<'a, A: AssetSource + ?Sized> ClassifierBuilder<'a, A> {
  pub fn new(assets: &'a A, model_path: impl Into<String>, labels_path: impl Into<String>) -> Self {
    Self {
      assets,
      model_path: model_path.into(),
      labels_path: labels_path.into(),
      options: EngineOptions::default(),
    }
  }

  pub fn num_threads(mut self, num_threads: usize) -> Self {
    self.options.num_threads = num_threads.max(1);
    self
  }

  pub fn build<L: EngineLoader>(
    self,
    loader: &L,
  ) -> Result<Classifier<L::Engine>, SetupError<L::Error>> {
    let labels = LabelStore::load(self.assets, &self.labels_path)?;

    info!("加载模型文件: {}", self.model_path);
    let model = self.assets.read_bytes(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建推理引擎，线程数: {}", self.options.num_threads);
    let engine = loader.load(model, &self.options).map_err(|e| {
      error!("推理引擎创建失败: {}", e);
      SetupError::Engine(e)
    })?;
    info!("模型加载完成");

    Ok(Classifier::new(engine, labels))
  }
}

/// 已加载的分类器
///
/// 每次请求都重新查询引擎的输入规格，不保存请求之间的状态。
pub struct Classifier<E> {
  engine: E,
  labels: LabelStore,
  run_lock: Mutex<()>,
}

impl<E: InferenceEngine> Classifier<E> {
  pub fn new(engine: E, labels: LabelStore) -> Self {
    Self {
      engine,
      labels,
      run_lock: Mutex::new(()),
    }
  }

  pub fn labels(&self) -> &LabelStore {
    &self.labels
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  pub fn input_spec(&self) -> Result<InputTensorSpec, ClassifyError<E::Error>> {
    self.engine.input_spec().map_err(ClassifyError::Engine)
  }

  /// 将图像编码为当前模型的输入
  pub fn encode(
    &self,
    image: &ArgbImage,
    config: &PreprocessConfig,
  ) -> Result<EncodedBuffer, ClassifyError<E::Error>> {
    let spec = self.input_spec()?;
    debug!(
      "模型输入: {}x{}x{} {}",
      spec.side, spec.side, spec.channels, spec.element_type
    );

    let transform = TransformMatrix::build(
      image.width(),
      image.height(),
      spec.side,
      config.maintain_aspect_ratio,
    )?;
    Ok(encode(image, &transform, &spec, config.mean, config.std)?)
  }

  /// 解码图像文件并编码，支持 `file://` 前缀
  #[cfg(feature = "read_image_file")]
  pub fn encode_path(
    &self,
    path: &str,
    config: &PreprocessConfig,
  ) -> Result<EncodedBuffer, ClassifyError<E::Error>> {
    let image = decode_image_file(path.trim_start_matches("file://"))?;
    self.encode(&image, config)
  }

  /// 执行推理，同一时刻只有一个推理在进行
  pub fn infer(&self, input: &EncodedBuffer) -> Result<Vec<f32>, ClassifyError<E::Error>> {
    let _guard = self.run_lock.lock().unwrap_or_else(PoisonError::into_inner);
    let now = std::time::Instant::now();
    let output = self.engine.run(input).map_err(ClassifyError::Engine)?;
    debug!("推理完成，耗时: {:.2?}", now.elapsed());
    Ok(output)
  }

  pub fn rank(&self, confidences: &[f32], config: &RankConfig) -> Vec<ClassificationResult> {
    select_top_n(
      confidences,
      &self.labels,
      config.num_results,
      config.threshold,
    )
  }

  pub fn classify(
    &self,
    image: &ArgbImage,
    preprocess: &PreprocessConfig,
    rank: &RankConfig,
  ) -> Result<Vec<ClassificationResult>, ClassifyError<E::Error>> {
    let input = self.encode(image, preprocess)?;
    let confidences = self.infer(&input)?;
    Ok(self.rank(&confidences, rank))
  }
}
