// 该文件是 Shanlan （山岚） 项目的一部分。
// tests/pipeline.rs - 分类流水线测试
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

mod common;

use std::{
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc,
  },
  time::Duration,
};

use common::{StubEngine, StubError, StubLoader};
use shanlan::{
  asset::FsAssetSource,
  frame::{ArgbImage, pack_argb},
  label::LabelStore,
  model::{Classifier, ClassifierBuilder, ClassifyError, PreprocessConfig, SetupError},
  output::{LogOutput, Render},
  rank::{ClassificationResult, RankConfig},
  task::{ContinuousTask, FrameWorker, OneShotTask, Submit, Task, WorkerError},
  tensor::{ElementType, InputTensorSpec, f32_from_ne_bytes},
};

fn write_assets(dir: &std::path::Path, labels: &str) {
  std::fs::write(dir.join("mobilenet.tflite"), [0x54u8, 0x46, 0x4c, 0x33]).unwrap();
  std::fs::write(dir.join("labels.txt"), labels).unwrap();
}

#[test]
fn setup_from_files_and_classify() {
  let dir = tempfile::tempdir().unwrap();
  write_assets(dir.path(), "cat\ndog\nbird\nfish\n\n");

  let assets = FsAssetSource::new(dir.path());
  let loader = StubLoader {
    spec: InputTensorSpec::new(8, 3, ElementType::Float32),
    output: vec![0.9, 0.05, 0.02, 0.03],
  };
  let classifier = ClassifierBuilder::new(&assets, "mobilenet.tflite", "labels.txt")
    .num_threads(4)
    .build(&loader)
    .unwrap();
  assert_eq!(classifier.labels().len(), 4);

  let image = ArgbImage::filled(32, 20, pack_argb(0xff, 200, 100, 50));
  let rank = RankConfig {
    num_results: 2,
    threshold: 0.01,
  };
  let results = classifier
    .classify(&image, &PreprocessConfig::default(), &rank)
    .unwrap();
  assert_eq!(
    results,
    vec![
      ClassificationResult {
        class_index: 0,
        label: "cat".to_string(),
        confidence: 0.9,
      },
      ClassificationResult {
        class_index: 1,
        label: "dog".to_string(),
        confidence: 0.05,
      },
    ]
  );
  assert_eq!(classifier.engine().runs.load(Ordering::SeqCst), 1);
}

#[test]
fn labels_missing_means_not_ready() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join("mobilenet.tflite"), [1u8]).unwrap();

  let assets = FsAssetSource::new(dir.path());
  let loader = StubLoader {
    spec: InputTensorSpec::new(8, 3, ElementType::UInt8),
    output: vec![],
  };
  let result = ClassifierBuilder::new(&assets, "mobilenet.tflite", "labels.txt").build(&loader);
  assert!(matches!(result, Err(SetupError::Label(_))));
}

#[test]
fn engine_setup_error_is_propagated_unchanged() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join("mobilenet.tflite"), b"").unwrap();
  std::fs::write(dir.path().join("labels.txt"), "a\n").unwrap();

  let assets = FsAssetSource::new(dir.path());
  let loader = StubLoader {
    spec: InputTensorSpec::new(8, 3, ElementType::UInt8),
    output: vec![],
  };
  let result = ClassifierBuilder::new(&assets, "mobilenet.tflite", "labels.txt").build(&loader);
  assert!(matches!(
    result,
    Err(SetupError::Engine(StubError::EmptyModel))
  ));
}

#[test]
fn encode_normalizes_whole_canvas() {
  let classifier = Classifier::new(
    StubEngine::new(4, ElementType::Float32, vec![]),
    LabelStore::from_lines(["x"]),
  );
  let image = ArgbImage::filled(10, 3, pack_argb(0xff, 255, 0, 128));
  let config = PreprocessConfig {
    mean: 128.0,
    std: 128.0,
    maintain_aspect_ratio: false,
  };
  let buffer = classifier.encode(&image, &config).unwrap();
  let values = f32_from_ne_bytes(buffer.as_bytes()).unwrap();
  assert_eq!(values.len(), 4 * 4 * 3);
  for px in values.chunks_exact(3) {
    assert_eq!(px, &[127.0 / 128.0, -1.0, 0.0]);
  }
}

#[test]
fn unsupported_engine_type_is_reported() {
  let classifier = Classifier::new(
    StubEngine::new(4, ElementType::Float16, vec![0.5]),
    LabelStore::from_lines(["x"]),
  );
  let err = classifier
    .classify(
      &ArgbImage::filled(4, 4, 0),
      &PreprocessConfig::default(),
      &RankConfig::default(),
    )
    .unwrap_err();
  assert!(matches!(err, ClassifyError::Encode(_)));
  assert_eq!(classifier.engine().runs.load(Ordering::SeqCst), 0);
}

#[cfg(feature = "read_image_file")]
#[test]
fn encode_path_decodes_image_files() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("red.png");
  image::RgbImage::from_pixel(6, 3, image::Rgb([255, 0, 0]))
    .save(&path)
    .unwrap();

  let classifier = Classifier::new(
    StubEngine::new(2, ElementType::UInt8, vec![]),
    LabelStore::from_lines(["x"]),
  );
  let path = format!("file://{}", path.display());
  let buffer = classifier
    .encode_path(&path, &PreprocessConfig::default())
    .unwrap();
  assert_eq!(buffer.as_bytes(), &[255, 0, 0, 255, 0, 0, 255, 0, 0, 255, 0, 0]);
}

#[test]
fn one_shot_task_renders_first_frame() {
  let classifier = Classifier::new(
    StubEngine::new(4, ElementType::UInt8, vec![0.2, 0.8]),
    LabelStore::from_lines(["a", "b"]),
  );
  let frames = vec![ArgbImage::filled(5, 5, 0), ArgbImage::filled(5, 5, 0)];
  OneShotTask::default()
    .run_task(frames.into_iter(), &classifier, &LogOutput)
    .unwrap();
  assert_eq!(classifier.engine().runs.load(Ordering::SeqCst), 1);
}

#[test]
fn one_shot_task_without_frames_fails() {
  let classifier = Classifier::new(
    StubEngine::new(4, ElementType::UInt8, vec![]),
    LabelStore::from_lines(["a"]),
  );
  let result = OneShotTask::default().run_task(std::iter::empty(), &classifier, &LogOutput);
  assert!(result.is_err());
}

#[test]
fn continuous_task_stops_at_frame_limit() {
  let classifier = Classifier::new(
    StubEngine::new(4, ElementType::UInt8, vec![0.6]),
    LabelStore::from_lines(["a"]),
  );
  let frames = (0..10).map(|_| ArgbImage::filled(3, 3, 0));
  ContinuousTask::new(PreprocessConfig::default(), RankConfig::default())
    .with_frame_number(Some(3))
    .run_task(frames, &classifier, &LogOutput)
    .unwrap();
  assert_eq!(classifier.engine().runs.load(Ordering::SeqCst), 3);
}

#[test]
fn continuous_task_honours_interrupt() {
  let classifier = Classifier::new(
    StubEngine::new(4, ElementType::UInt8, vec![0.6]),
    LabelStore::from_lines(["a"]),
  );
  let interrupt = Arc::new(AtomicBool::new(true));
  let frames = (0..10).map(|_| ArgbImage::filled(3, 3, 0));
  ContinuousTask::new(PreprocessConfig::default(), RankConfig::default())
    .with_interrupt(interrupt)
    .run_task(frames, &classifier, &LogOutput)
    .unwrap();
  assert_eq!(classifier.engine().runs.load(Ordering::SeqCst), 0);
}

#[test]
fn log_output_accepts_results() {
  let frame = ArgbImage::filled(1, 1, 0);
  let results = vec![ClassificationResult {
    class_index: 0,
    label: "a".to_string(),
    confidence: 1.0,
  }];
  assert!(LogOutput.render_result(&frame, &results).is_ok());
}

#[test]
fn worker_drops_frames_while_busy() {
  let (gate_tx, gate_rx) = mpsc::channel();
  let classifier = Arc::new(Classifier::new(
    StubEngine::new(4, ElementType::UInt8, vec![0.3, 0.7]).gated(gate_rx),
    LabelStore::from_lines(["a", "b"]),
  ));

  let mut worker =
    FrameWorker::spawn(classifier.clone(), PreprocessConfig::default(), RankConfig::default())
      .unwrap();

  let frame = || ArgbImage::filled(8, 8, pack_argb(0xff, 1, 2, 3));
  assert_eq!(worker.submit(frame()).unwrap(), Submit::Accepted);
  assert!(worker.is_busy());
  assert_eq!(worker.submit(frame()).unwrap(), Submit::Dropped);
  assert_eq!(worker.submit(frame()).unwrap(), Submit::Dropped);
  assert_eq!(worker.dropped_frames(), 2);

  gate_tx.send(()).unwrap();
  let outcome = worker.recv_timeout(Duration::from_secs(5)).unwrap();
  assert_eq!(outcome.frame_index, 1);
  let results = outcome.result.unwrap();
  assert_eq!(results[0].label, "b");

  assert_eq!(worker.submit(frame()).unwrap(), Submit::Accepted);
  gate_tx.send(()).unwrap();
  let outcome = worker.recv_timeout(Duration::from_secs(5)).unwrap();
  assert_eq!(outcome.frame_index, 2);
  assert!(worker.try_recv().is_none());

  drop(worker);
  assert_eq!(classifier.engine().runs.load(Ordering::SeqCst), 2);
}

#[test]
fn worker_reports_request_errors() {
  let classifier = Arc::new(Classifier::new(
    StubEngine::new(4, ElementType::UInt8, vec![0.3]),
    LabelStore::from_lines(["a"]),
  ));
  let mut worker =
    FrameWorker::spawn(classifier, PreprocessConfig::default(), RankConfig::default()).unwrap();

  assert_eq!(
    worker.submit(ArgbImage::filled(0, 4, 0)).unwrap(),
    Submit::Accepted
  );
  let outcome = worker.recv_timeout(Duration::from_secs(5)).unwrap();
  assert!(matches!(outcome.result, Err(ClassifyError::Transform(_))));
}

fn wait_idle<E: std::error::Error + Send + 'static>(worker: &FrameWorker<E>) {
  for _ in 0..5000 {
    if !worker.is_busy() {
      return;
    }
    std::thread::sleep(Duration::from_millis(1));
  }
  panic!("worker stayed busy");
}

#[test]
fn worker_panic_closes_the_worker() {
  let classifier = Arc::new(Classifier::new(
    StubEngine::new(4, ElementType::UInt8, vec![0.5]).panicking(),
    LabelStore::from_lines(["a"]),
  ));
  let mut worker =
    FrameWorker::spawn(classifier.clone(), PreprocessConfig::default(), RankConfig::default())
      .unwrap();

  let frame = || ArgbImage::filled(4, 4, pack_argb(0xff, 9, 9, 9));
  assert_eq!(worker.submit(frame()).unwrap(), Submit::Accepted);
  assert!(matches!(
    worker.recv_timeout(Duration::from_secs(5)),
    Err(WorkerError::Closed)
  ));
  assert!(!worker.is_busy());
  assert!(matches!(worker.submit(frame()), Err(WorkerError::Closed)));
  assert!(matches!(worker.submit(frame()), Err(WorkerError::Closed)));
  assert_eq!(worker.dropped_frames(), 0);
  assert_eq!(classifier.engine().runs.load(Ordering::SeqCst), 1);
}

#[test]
fn worker_holds_at_most_one_undelivered_result() {
  let classifier = Arc::new(Classifier::new(
    StubEngine::new(4, ElementType::UInt8, vec![0.9]),
    LabelStore::from_lines(["a"]),
  ));
  let mut worker =
    FrameWorker::spawn(classifier.clone(), PreprocessConfig::default(), RankConfig::default())
      .unwrap();

  let frame = || ArgbImage::filled(4, 4, pack_argb(0xff, 1, 1, 1));
  // 第一条结果留在通道里，第二帧处理完后工作线程等待投递
  assert_eq!(worker.submit(frame()).unwrap(), Submit::Accepted);
  wait_idle(&worker);
  assert_eq!(worker.submit(frame()).unwrap(), Submit::Accepted);
  wait_idle(&worker);
  assert_eq!(classifier.engine().runs.load(Ordering::SeqCst), 2);

  // 第三帧进入帧槽位但不会被处理，第四帧被丢弃
  assert_eq!(worker.submit(frame()).unwrap(), Submit::Accepted);
  assert_eq!(worker.submit(frame()).unwrap(), Submit::Dropped);
  assert_eq!(classifier.engine().runs.load(Ordering::SeqCst), 2);

  for expected in 1..=3 {
    let outcome = worker.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(outcome.frame_index, expected);
    assert!(outcome.result.is_ok());
  }
  drop(worker);
  assert_eq!(classifier.engine().runs.load(Ordering::SeqCst), 3);
}
