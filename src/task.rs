// 该文件是 Shanlan （山岚） 项目的一部分。
// src/task.rs - 分类任务
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

use std::sync::{
  Arc, OnceLock,
  atomic::{AtomicBool, Ordering},
};

use tracing::{info, warn};

use crate::{
  frame::ArgbImage,
  model::{Classifier, InferenceEngine, PreprocessConfig},
  output::Render,
  rank::{ClassificationResult, RankConfig},
};

mod frame_worker;
pub use self::frame_worker::{FrameOutcome, FrameWorker, Submit, WorkerError};

pub trait Task<I, E, O>: Sized {
  type Error;
  fn run_task(self, input: I, classifier: &Classifier<E>, output: &O) -> Result<(), Self::Error>;
}

static INTERRUPTED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// 安装 Ctrl-C 处理器，返回中断标记
///
/// 进程内只安装一次，后续调用返回同一个标记。
pub fn interrupt_flag() -> Result<Arc<AtomicBool>, ctrlc::Error> {
  if let Some(flag) = INTERRUPTED.get() {
    return Ok(flag.clone());
  }

  let flag = Arc::new(AtomicBool::new(false));
  let handler_flag = flag.clone();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    handler_flag.store(true, Ordering::SeqCst);
  })?;
  Ok(INTERRUPTED.get_or_init(|| flag).clone())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OneShotTask {
  pub preprocess: PreprocessConfig,
  pub rank: RankConfig,
}

impl<I, E, O, RE> Task<I, E, O> for OneShotTask
where
  I: Iterator<Item = ArgbImage>,
  E: InferenceEngine,
  O: Render<ArgbImage, Vec<ClassificationResult>, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, classifier: &Classifier<E>, output: &O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始分类...");
    let now = std::time::Instant::now();
    let result = classifier.classify(&frame, &self.preprocess, &self.rank)?;
    info!("分类完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;

    Ok(())
  }
}

#[derive(Debug, Default, Clone)]
pub struct ContinuousTask {
  preprocess: PreprocessConfig,
  rank: RankConfig,
  frame_number: Option<usize>,
  interrupt: Option<Arc<AtomicBool>>,
}

impl ContinuousTask {
  pub fn new(preprocess: PreprocessConfig, rank: RankConfig) -> Self {
    Self {
      preprocess,
      rank,
      ..Self::default()
    }
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  fn interrupted(&self) -> bool {
    self
      .interrupt
      .as_ref()
      .is_some_and(|flag| flag.load(Ordering::SeqCst))
  }
}

impl<I, E, O, RE> Task<I, E, O> for ContinuousTask
where
  I: Iterator<Item = ArgbImage>,
  E: InferenceEngine,
  O: Render<ArgbImage, Vec<ClassificationResult>, Error = RE>,
  RE: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, classifier: &Classifier<E>, output: &O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let mut frame_index = 0usize;
    for frame in input {
      if self.interrupted() {
        warn!("中断信号接收，退出任务循环");
        break;
      }

      frame_index += 1;
      info!("处理第 {} 帧图像", frame_index);
      let now = std::time::Instant::now();
      let result = classifier.classify(&frame, &self.preprocess, &self.rank)?;
      let elapsed = now.elapsed();
      output.render_result(&frame, &result)?;
      info!("分类完成，耗时: {:.2?}", elapsed);

      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
    }

    info!("任务完成，共处理 {} 帧", frame_index);
    Ok(())
  }
}
