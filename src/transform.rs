// 该文件是 Shanlan （山岚） 项目的一部分。
// src/transform.rs - 仿射变换矩阵
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

//! # 变换矩阵
//!
//! 将任意尺寸的源图像映射到模型固定的正方形输入画布。
//!
//! 矩阵只包含缩放与平移两部分，形如：
//!
//! ```text
//! | sx  0  tx |
//! | 0   sy ty |
//! ```
//!
//! 缩放因子在构造时保证非零且有限，因此矩阵总是可逆的。
//! `inverted` 标记矩阵方向：`false` 表示源图像坐标到画布坐标（正向），
//! `true` 表示画布坐标到源图像坐标（逆向）。光栅化器根据该标记决定是否求逆。

use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
  #[error("无效尺寸: 源图像 {src_width}x{src_height}, 目标边长 {dst_side}")]
  InvalidDimensions {
    src_width: u32,
    src_height: u32,
    dst_side: u32,
  },
  #[error("无效缩放因子: ({0}, {1})")]
  InvalidScale(f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
  sx: f32,
  sy: f32,
  tx: f32,
  ty: f32,
  inverted: bool,
}

impl Default for TransformMatrix {
  fn default() -> Self {
    Self::identity()
  }
}

impl TransformMatrix {
  pub fn identity() -> Self {
    Self {
      sx: 1.0,
      sy: 1.0,
      tx: 0.0,
      ty: 0.0,
      inverted: false,
    }
  }

  pub fn scale(sx: f32, sy: f32) -> Result<Self, TransformError> {
    if !sx.is_finite() || !sy.is_finite() || sx == 0.0 || sy == 0.0 {
      return Err(TransformError::InvalidScale(sx, sy));
    }

    Ok(Self {
      sx,
      sy,
      ..Self::identity()
    })
  }

  /// 构造源图像到 `dst_side x dst_side` 画布的正向变换
  ///
  /// - 源尺寸已等于目标边长时为单位矩阵；
  /// - `maintain_aspect_ratio` 为真时使用 `max(scale_x, scale_y)` 统一缩放，
  ///   填满画布并裁剪溢出部分；
  /// - 否则两个方向独立缩放（拉伸）。
  pub fn build(
    src_width: u32,
    src_height: u32,
    dst_side: u32,
    maintain_aspect_ratio: bool,
  ) -> Result<Self, TransformError> {
    if src_width == 0 || src_height == 0 || dst_side == 0 {
      error!(
        "无效尺寸: 源图像 {}x{}, 目标边长 {}",
        src_width, src_height, dst_side
      );
      return Err(TransformError::InvalidDimensions {
        src_width,
        src_height,
        dst_side,
      });
    }

    if src_width == dst_side && src_height == dst_side {
      debug!("源尺寸与目标一致，使用单位矩阵");
      return Ok(Self::identity());
    }

    let scale_x = dst_side as f32 / src_width as f32;
    let scale_y = dst_side as f32 / src_height as f32;

    let matrix = if maintain_aspect_ratio {
      let factor = scale_x.max(scale_y);
      Self::scale(factor, factor)?
    } else {
      Self::scale(scale_x, scale_y)?
    };

    debug!(
      "变换矩阵: {}x{} -> {}, 缩放 ({}, {})",
      src_width, src_height, dst_side, matrix.sx, matrix.sy
    );
    Ok(matrix)
  }

  /// 在当前变换之后追加平移
  pub fn post_translate(mut self, dx: f32, dy: f32) -> Self {
    self.tx += dx;
    self.ty += dy;
    self
  }

  /// 求逆，翻转 `inverted` 标记
  pub fn invert(&self) -> Self {
    Self {
      sx: 1.0 / self.sx,
      sy: 1.0 / self.sy,
      tx: -self.tx / self.sx,
      ty: -self.ty / self.sy,
      inverted: !self.inverted,
    }
  }

  pub fn map_point(&self, x: f32, y: f32) -> (f32, f32) {
    (self.sx * x + self.tx, self.sy * y + self.ty)
  }

  pub fn scale_x(&self) -> f32 {
    self.sx
  }

  pub fn scale_y(&self) -> f32 {
    self.sy
  }

  pub fn translate_x(&self) -> f32 {
    self.tx
  }

  pub fn translate_y(&self) -> f32 {
    self.ty
  }

  pub fn is_inverted(&self) -> bool {
    self.inverted
  }

  pub fn is_identity(&self) -> bool {
    self.sx == 1.0 && self.sy == 1.0 && self.tx == 0.0 && self.ty == 0.0
  }

  /// 2x3 行优先形式
  pub fn as_affine(&self) -> [[f32; 3]; 2] {
    [[self.sx, 0.0, self.tx], [0.0, self.sy, self.ty]]
  }
}
