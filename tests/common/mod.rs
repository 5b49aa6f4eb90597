// 该文件是 Shanlan （山岚） 项目的一部分。
// tests/common/mod.rs - 测试用推理引擎
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

#![allow(dead_code)]

use std::sync::{
  Mutex,
  atomic::{AtomicUsize, Ordering},
  mpsc::Receiver,
};

use shanlan::{
  model::{EngineLoader, EngineOptions, InferenceEngine},
  tensor::{ElementType, EncodedBuffer, InputTensorSpec},
};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum StubError {
  #[error("输入长度错误: {0}")]
  BadInput(usize),
  #[error("模型为空")]
  EmptyModel,
}

/// 返回固定置信度的引擎，可选地在每次推理前等待放行信号
pub struct StubEngine {
  pub spec: InputTensorSpec,
  pub output: Vec<f32>,
  pub runs: AtomicUsize,
  pub gate: Option<Mutex<Receiver<()>>>,
  pub panic_on_run: bool,
}

impl StubEngine {
  pub fn new(side: u32, element_type: ElementType, output: Vec<f32>) -> Self {
    Self {
      spec: InputTensorSpec::new(side, 3, element_type),
      output,
      runs: AtomicUsize::new(0),
      gate: None,
      panic_on_run: false,
    }
  }

  /// 每次推理都 panic，模拟推理后端崩溃
  pub fn panicking(mut self) -> Self {
    self.panic_on_run = true;
    self
  }

  pub fn gated(mut self, gate: Receiver<()>) -> Self {
    self.gate = Some(Mutex::new(gate));
    self
  }
}

impl InferenceEngine for StubEngine {
  type Error = StubError;

  fn input_spec(&self) -> Result<InputTensorSpec, Self::Error> {
    Ok(self.spec)
  }

  fn run(&self, input: &EncodedBuffer) -> Result<Vec<f32>, Self::Error> {
    if let Some(gate) = &self.gate {
      let _ = gate.lock().map(|rx| rx.recv());
    }
    self.runs.fetch_add(1, Ordering::SeqCst);
    if self.panic_on_run {
      panic!("推理后端崩溃");
    }
    if input.len() != self.spec.encoded_len() {
      return Err(StubError::BadInput(input.len()));
    }
    Ok(self.output.clone())
  }
}

pub struct StubLoader {
  pub spec: InputTensorSpec,
  pub output: Vec<f32>,
}

impl EngineLoader for StubLoader {
  type Engine = StubEngine;
  type Error = StubError;

  fn load(&self, model: Vec<u8>, _options: &EngineOptions) -> Result<StubEngine, StubError> {
    if model.is_empty() {
      return Err(StubError::EmptyModel);
    }
    Ok(StubEngine {
      spec: self.spec,
      output: self.output.clone(),
      runs: AtomicUsize::new(0),
      gate: None,
      panic_on_run: false,
    })
  }
}
