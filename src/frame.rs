// 该文件是 Shanlan （山岚） 项目的一部分。
// src/frame.rs - ARGB 帧定义
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

use image::{Rgba, RgbaImage};
use thiserror::Error;

const RGB_CHANNELS: usize = 3;
const RGBA_CHANNELS: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

#[inline]
pub fn alpha(pixel: u32) -> u8 {
  (pixel >> 24) as u8
}

#[inline]
pub fn red(pixel: u32) -> u8 {
  (pixel >> 16) as u8
}

#[inline]
pub fn green(pixel: u32) -> u8 {
  (pixel >> 8) as u8
}

#[inline]
pub fn blue(pixel: u32) -> u8 {
  pixel as u8
}

/// 将分量打包为 0xAARRGGBB
#[inline]
pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
  (a as u32) << 24 | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// 已解码的图像，每个像素按 0xAARRGGBB 打包
///
/// 解码之后不可变，行优先存储。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgbImage {
  width: u32,
  height: u32,
  pixels: Box<[u32]>,
}

impl ArgbImage {
  pub fn from_pixels(width: u32, height: u32, pixels: Vec<u32>) -> Result<Self, FrameError> {
    let expected = width as usize * height as usize;
    if pixels.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: pixels.len(),
      });
    }

    Ok(Self {
      width,
      height,
      pixels: pixels.into_boxed_slice(),
    })
  }

  /// 从 NHWC 排列的 RGB 字节构造，alpha 置为 0xFF
  pub fn from_rgb(width: u32, height: u32, data: &[u8]) -> Result<Self, FrameError> {
    let expected = RGB_CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    let pixels = data
      .chunks_exact(RGB_CHANNELS)
      .map(|px| pack_argb(0xff, px[0], px[1], px[2]))
      .collect();
    Self::from_pixels(width, height, pixels)
  }

  /// 从 NHWC 排列的 RGBA 字节构造
  pub fn from_rgba(width: u32, height: u32, data: &[u8]) -> Result<Self, FrameError> {
    let expected = RGBA_CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    let pixels = data
      .chunks_exact(RGBA_CHANNELS)
      .map(|px| pack_argb(px[3], px[0], px[1], px[2]))
      .collect();
    Self::from_pixels(width, height, pixels)
  }

  /// 单色图像
  pub fn filled(width: u32, height: u32, pixel: u32) -> Self {
    let pixels = vec![pixel; width as usize * height as usize].into_boxed_slice();
    Self {
      width,
      height,
      pixels,
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn pixels(&self) -> &[u32] {
    &self.pixels
  }

  pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
    if x >= self.width || y >= self.height {
      return None;
    }
    Some(self.pixels[y as usize * self.width as usize + x as usize])
  }

  /// 展开为 `image` 的 RGBA 缓冲区，供 `imageops` 使用
  pub fn to_rgba_image(&self) -> RgbaImage {
    let width = self.width as usize;
    RgbaImage::from_fn(self.width, self.height, |x, y| {
      let px = self.pixels[y as usize * width + x as usize];
      Rgba([red(px), green(px), blue(px), alpha(px)])
    })
  }
}

impl From<RgbaImage> for ArgbImage {
  fn from(image: RgbaImage) -> Self {
    let (width, height) = image.dimensions();
    let pixels = image
      .pixels()
      .map(|px| pack_argb(px[3], px[0], px[1], px[2]))
      .collect::<Vec<_>>()
      .into_boxed_slice();
    Self {
      width,
      height,
      pixels,
    }
  }
}

impl From<image::RgbImage> for ArgbImage {
  fn from(image: image::RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let pixels = image
      .pixels()
      .map(|px| pack_argb(0xff, px[0], px[1], px[2]))
      .collect::<Vec<_>>()
      .into_boxed_slice();
    Self {
      width,
      height,
      pixels,
    }
  }
}
