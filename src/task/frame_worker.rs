// 该文件是 Shanlan （山岚） 项目的一部分。
// src/task/frame_worker.rs - 单槽背压的分类工作线程
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

//! # 帧工作线程
//!
//! 实时摄像头场景下每一帧都会发起一次分类。分类在独立线程上执行，
//! 同一时刻最多一帧在处理中：上一帧尚未完成时提交的新帧直接丢弃，不排队。
//! 已经开始处理的帧总会执行完毕。
//!
//! 结果通道同样只有一个槽位。调用方不取走结果时，工作线程在投递下一条结果前等待。

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError},
  },
  thread::{self, JoinHandle},
  time::Duration,
};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  frame::ArgbImage,
  model::{Classifier, ClassifyError, InferenceEngine, PreprocessConfig},
  rank::{ClassificationResult, RankConfig},
};

#[derive(Error, Debug)]
pub enum WorkerError {
  #[error("工作线程已退出")]
  Closed,
  #[error("等待结果超时")]
  Timeout,
  #[error("创建工作线程失败: {0}")]
  Spawn(#[from] std::io::Error),
}

/// 帧提交结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submit {
  Accepted,
  Dropped,
}

#[derive(Debug)]
pub struct FrameOutcome<E: std::error::Error + 'static> {
  /// 被接受的帧的序号，从 1 开始
  pub frame_index: u64,
  pub result: Result<Vec<ClassificationResult>, ClassifyError<E>>,
}

/// 离开作用域时释放处理槽位，分类过程 panic 时同样生效
struct SlotGuard<'a>(&'a AtomicBool);

impl Drop for SlotGuard<'_> {
  fn drop(&mut self) {
    if thread::panicking() {
      error!("分类过程中发生 panic，工作线程退出");
    }
    self.0.store(false, Ordering::SeqCst);
  }
}

pub struct FrameWorker<E: std::error::Error + 'static> {
  sender: Option<SyncSender<ArgbImage>>,
  results: Receiver<FrameOutcome<E>>,
  busy: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
  dropped: u64,
}

impl<Err: std::error::Error + Send + 'static> FrameWorker<Err> {
  pub fn spawn<E>(
    classifier: Arc<Classifier<E>>,
    preprocess: PreprocessConfig,
    rank: RankConfig,
  ) -> Result<Self, WorkerError>
  where
    E: InferenceEngine<Error = Err> + Send + Sync + 'static,
  {
    let (frame_tx, frame_rx) = mpsc::sync_channel::<ArgbImage>(1);
    let (result_tx, results) = mpsc::sync_channel(1);
    let busy = Arc::new(AtomicBool::new(false));

    let worker_busy = busy.clone();
    let handle = thread::Builder::new()
      .name("shanlan-worker".to_string())
      .spawn(move || {
        let mut frame_index = 0u64;
        for frame in frame_rx {
          frame_index += 1;
          debug!("工作线程处理第 {} 帧", frame_index);
          // 先释放槽位再投递结果，收到结果的调用方可以立即提交下一帧
          let result = {
            let _slot = SlotGuard(&worker_busy);
            classifier.classify(&frame, &preprocess, &rank)
          };
          if result_tx.send(FrameOutcome {
            frame_index,
            result,
          })
          .is_err()
          {
            break;
          }
        }
        info!("工作线程退出");
      })?;

    Ok(Self {
      sender: Some(frame_tx),
      results,
      busy,
      handle: Some(handle),
      dropped: 0,
    })
  }

  /// 提交一帧，上一帧仍在处理时丢弃
  ///
  /// 工作线程已经退出（包括分类过程 panic）时返回 [`WorkerError::Closed`]。
  pub fn submit(&mut self, frame: ArgbImage) -> Result<Submit, WorkerError> {
    if self.handle.as_ref().is_none_or(JoinHandle::is_finished) {
      self.sender.take();
      return Err(WorkerError::Closed);
    }

    let Some(sender) = self.sender.as_ref() else {
      return Err(WorkerError::Closed);
    };

    if self
      .busy
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      self.dropped += 1;
      warn!("上一帧仍在处理，丢弃当前帧 (累计丢弃 {})", self.dropped);
      return Ok(Submit::Dropped);
    }

    match sender.try_send(frame) {
      Ok(()) => Ok(Submit::Accepted),
      Err(TrySendError::Full(_)) => {
        self.busy.store(false, Ordering::SeqCst);
        self.dropped += 1;
        Ok(Submit::Dropped)
      }
      Err(TrySendError::Disconnected(_)) => {
        self.busy.store(false, Ordering::SeqCst);
        Err(WorkerError::Closed)
      }
    }
  }

  pub fn is_busy(&self) -> bool {
    self.busy.load(Ordering::SeqCst)
  }

  pub fn dropped_frames(&self) -> u64 {
    self.dropped
  }

  pub fn try_recv(&self) -> Option<FrameOutcome<Err>> {
    self.results.try_recv().ok()
  }

  pub fn recv(&self) -> Option<FrameOutcome<Err>> {
    self.results.recv().ok()
  }

  pub fn recv_timeout(&self, timeout: Duration) -> Result<FrameOutcome<Err>, WorkerError> {
    self.results.recv_timeout(timeout).map_err(|e| match e {
      RecvTimeoutError::Timeout => WorkerError::Timeout,
      RecvTimeoutError::Disconnected => WorkerError::Closed,
    })
  }
}

impl<E: std::error::Error + 'static> Drop for FrameWorker<E> {
  fn drop(&mut self) {
    self.sender.take();
    // 取走剩余结果，避免工作线程阻塞在结果通道上
    while self.results.recv().is_ok() {}
    if let Some(handle) = self.handle.take()
      && handle.join().is_err()
    {
      warn!("工作线程异常退出");
    }
  }
}
