// 该文件是 Shanlan （山岚） 项目的一部分。
// src/bin/preprocess.rs - 图像预处理工具
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use shanlan::{
  FromUrl,
  input::ImageFileInput,
  tensor::{ElementType, InputTensorSpec, encode},
  transform::TransformMatrix,
};

/// 将图像编码为模型输入张量
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，例如 image:///data/cat.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 模型输入边长
  #[arg(long, default_value_t = 224, value_name = "SIDE")]
  pub side: u32,
  /// 模型声明的通道数
  #[arg(long, default_value_t = 3, value_name = "CHANNELS")]
  pub channels: usize,
  /// 元素类型 (uint8 / float32)
  #[arg(long, default_value = "float32", value_name = "TYPE")]
  pub element_type: ElementType,
  #[arg(long, default_value_t = 127.5)]
  pub mean: f32,
  #[arg(long, default_value_t = 127.5)]
  pub std: f32,
  /// 保持宽高比填满画布（裁剪溢出部分）
  #[arg(long)]
  pub keep_aspect: bool,
  /// 输出的原始张量文件
  #[arg(long, value_name = "OUTPUT")]
  pub output: PathBuf,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output.display());

  let image = ImageFileInput::from_url(&args.input)?
    .next()
    .ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
  info!("图像尺寸: {}x{}", image.width(), image.height());

  let spec = InputTensorSpec::new(args.side, args.channels, args.element_type);
  let transform =
    TransformMatrix::build(image.width(), image.height(), args.side, args.keep_aspect)?;

  let now = std::time::Instant::now();
  let buffer = encode(&image, &transform, &spec, args.mean, args.std)?;
  info!("编码完成，耗时: {:.2?}", now.elapsed());

  std::fs::write(&args.output, buffer.as_bytes())
    .with_context(|| format!("无法写入张量文件: {}", args.output.display()))?;
  info!(
    "已写入 {} 字节 ({}x{}x3 {})",
    buffer.len(),
    args.side,
    args.side,
    args.element_type
  );

  Ok(())
}
