// 该文件是 Shanlan （山岚） 项目的一部分。
// src/tensor/encode.rs - 光栅化与张量编码
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

use image::{
  RgbaImage,
  imageops::{self, FilterType},
};
use tracing::{debug, error, trace};

use crate::{
  frame::ArgbImage,
  tensor::{ENCODED_CHANNELS, ElementType, EncodeError, EncodedBuffer, InputTensorSpec},
  transform::TransformMatrix,
};

/// 单个坐标轴上落入画布的源区间及其目标位置
#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
  start: u32,
  len: u32,
  scaled: u32,
  at: i64,
}

/// `scale` 必须为正。区间之外的源像素映射到画布外，先裁掉再缩放。
fn visible_span(scale: f32, offset: f32, src_len: u32, side: u32) -> Option<Span> {
  let start = (-offset / scale).floor().max(0.0);
  let end = ((side as f32 - offset) / scale).ceil().min(src_len as f32);
  if end <= start {
    return None;
  }

  let (start, len) = (start as u32, (end - start) as u32);
  Some(Span {
    start,
    len,
    scaled: ((len as f32 * scale).round() as u32).max(1),
    at: (offset + start as f32 * scale).round() as i64,
  })
}

/// 在 `side x side` 的透明黑色画布上绘制经正向变换的源图像
fn paint(image: &ArgbImage, transform: &TransformMatrix, side: u32) -> RgbaImage {
  let forward = if transform.is_inverted() {
    transform.invert()
  } else {
    *transform
  };

  let mut canvas = RgbaImage::new(side, side);
  let mut source = image.to_rgba_image();

  // 负缩放等价于先翻转再正向缩放
  let (mut sx, mut tx) = (forward.scale_x(), forward.translate_x());
  if sx < 0.0 {
    imageops::flip_horizontal_in_place(&mut source);
    tx += sx * source.width() as f32;
    sx = -sx;
  }
  let (mut sy, mut ty) = (forward.scale_y(), forward.translate_y());
  if sy < 0.0 {
    imageops::flip_vertical_in_place(&mut source);
    ty += sy * source.height() as f32;
    sy = -sy;
  }

  let (Some(x), Some(y)) = (
    visible_span(sx, tx, source.width(), side),
    visible_span(sy, ty, source.height(), side),
  ) else {
    debug!("源图像完全落在画布之外");
    return canvas;
  };

  let region = imageops::crop_imm(&source, x.start, y.start, x.len, y.len).to_image();
  let resized = imageops::resize(&region, x.scaled, y.scaled, FilterType::Nearest);
  trace!(
    "绘制区域: 源 ({}, {}) {}x{} -> 画布 ({}, {}) {}x{}",
    x.start, y.start, x.len, y.len, x.at, y.at, x.scaled, y.scaled
  );
  // replace 不做 alpha 混合，半透明像素的 RGB 原样保留
  imageops::replace(&mut canvas, &resized, x.at, y.at);
  canvas
}

/// 将源图像经 `transform` 绘制到 `side x side` 的画布上
///
/// 画布初始为透明黑色，最近邻缩放，超出画布的部分被裁掉。
/// 正向矩阵（`is_inverted() == false`）直接使用，已求逆的矩阵先还原为正向。
pub fn rasterize(image: &ArgbImage, transform: &TransformMatrix, side: u32) -> ArgbImage {
  ArgbImage::from(paint(image, transform, side))
}

/// 将图像编码为与输入张量一致的字节缓冲区
///
/// 行优先、通道交错，通道顺序固定为 R、G、B，丢弃 alpha：
/// - `Float32`: 每个分量写入 `(c - mean) / std`，本机字节序；
/// - `UInt8`: 原样写入分量字节。
pub fn encode(
  image: &ArgbImage,
  transform: &TransformMatrix,
  spec: &InputTensorSpec,
  mean: f32,
  std: f32,
) -> Result<EncodedBuffer, EncodeError> {
  match spec.element_type {
    ElementType::UInt8 | ElementType::Float32 => {}
    other => {
      error!("不支持的元素类型: {}", other);
      return Err(EncodeError::UnsupportedElementType(other));
    }
  }

  if spec.channels != ENCODED_CHANNELS {
    error!(
      "通道数不匹配: 期望 {}, 模型声明 {}",
      ENCODED_CHANNELS, spec.channels
    );
    return Err(EncodeError::ChannelMismatch {
      expected: ENCODED_CHANNELS,
      actual: spec.channels,
    });
  }

  if spec.side == 0 {
    return Err(EncodeError::InvalidSide(spec.side));
  }

  if spec.element_type == ElementType::Float32
    && (!mean.is_finite() || !std.is_finite() || std == 0.0)
  {
    return Err(EncodeError::InvalidNormalization { mean, std });
  }

  let canvas = paint(image, transform, spec.side);
  let mut data = Vec::with_capacity(spec.encoded_len());

  match spec.element_type {
    ElementType::Float32 => {
      for px in canvas.pixels() {
        for &c in &px.0[..ENCODED_CHANNELS] {
          let value = (c as f32 - mean) / std;
          data.extend_from_slice(&value.to_ne_bytes());
        }
      }
    }
    _ => {
      for px in canvas.pixels() {
        data.extend_from_slice(&px.0[..ENCODED_CHANNELS]);
      }
    }
  }

  debug!(
    "编码完成: {}x{} {} -> {} 字节",
    spec.side,
    spec.side,
    spec.element_type,
    data.len()
  );

  EncodedBuffer::new(spec.element_type, spec.side, data)
}
