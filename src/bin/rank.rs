// 该文件是 Shanlan （山岚） 项目的一部分。
// src/bin/rank.rs - 置信度排序工具
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{path::PathBuf, sync::atomic::Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use shanlan::{
  FromUrl,
  asset::FsAssetSource,
  frame::ArgbImage,
  label::LabelStore,
  output::{OutputWrapper, Render},
  rank::select_top_n,
  task::interrupt_flag,
  tensor::f32_from_ne_bytes,
};

/// 将模型输出的置信度向量转换为排序后的标签
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 本机字节序的 f32 置信度文件，可指定多个，按顺序各算一帧
  #[arg(long, value_name = "FILE", required = true, num_args = 1..)]
  pub confidences: Vec<PathBuf>,
  /// 标签文件，每行一个标签
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,
  /// 最多返回的结果数
  #[arg(long, default_value_t = 3, value_name = "COUNT")]
  pub top: usize,
  /// 置信度阈值，严格大于才会保留
  #[arg(long, default_value_t = 0.1, value_name = "THRESHOLD")]
  pub threshold: f32,
  /// 结果输出，例如 log:stdout 或 json:///tmp/results.jsonl
  #[arg(long, default_value = "log:stdout", value_name = "SINK")]
  pub output: Url,
  /// 另外以 JSON 打印到标准输出
  #[arg(long)]
  pub json: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  info!("输出目标: {}", args.output);
  let output = OutputWrapper::from_url(&args.output)?;
  let interrupted = interrupt_flag()?;

  let assets = FsAssetSource::new("");
  let labels = LabelStore::load(&assets, &args.labels.to_string_lossy())?;

  // 置信度文件没有对应的图像，输出记录中的尺寸为 0
  let frame = ArgbImage::filled(0, 0, 0);

  for (done, path) in args.confidences.iter().enumerate() {
    if interrupted.load(Ordering::SeqCst) {
      warn!("收到中断信号，跳过剩余 {} 个文件", args.confidences.len() - done);
      break;
    }

    let bytes = std::fs::read(path)
      .with_context(|| format!("无法读取置信度文件: {}", path.display()))?;
    let confidences = f32_from_ne_bytes(&bytes)?;
    info!(
      "{}: 置信度数量 {}, 标签数量 {}",
      path.display(),
      confidences.len(),
      labels.len()
    );

    let results = select_top_n(&confidences, &labels, args.top, args.threshold);
    output.render_result(&frame, &results)?;

    if args.json {
      println!("{}", serde_json::to_string(&results)?);
    }
  }

  Ok(())
}
