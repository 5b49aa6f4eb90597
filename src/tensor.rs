// 该文件是 Shanlan （山岚） 项目的一部分。
// src/tensor.rs - 输入张量定义
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

use std::{fmt, str::FromStr};

use thiserror::Error;

/// 编码器总是写入 R、G、B 三个通道
pub const ENCODED_CHANNELS: usize = 3;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
  #[error("不支持的元素类型: {0}")]
  UnsupportedElementType(ElementType),
  #[error("通道数不匹配: 期望 {expected}, 模型声明 {actual}")]
  ChannelMismatch { expected: usize, actual: usize },
  #[error("无效的边长: {0}")]
  InvalidSide(u32),
  #[error("无效的归一化参数: mean={mean}, std={std}")]
  InvalidNormalization { mean: f32, std: f32 },
  #[error("字节长度 {0} 不是 4 的整数倍")]
  MisalignedFloatBytes(usize),
  #[error("未知的元素类型名称: {0}")]
  UnknownElementTypeName(String),
  #[error("缓冲区长度不匹配: 期望 {expected} 字节, 实际 {actual} 字节")]
  BufferLengthMismatch { expected: usize, actual: usize },
}

/// 张量元素类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
  UInt8,
  Int8,
  Int16,
  Int32,
  Int64,
  Float16,
  Float32,
  Float64,
  Bool,
}

impl ElementType {
  pub fn bytes_per_element(&self) -> usize {
    match self {
      ElementType::UInt8 | ElementType::Int8 | ElementType::Bool => 1,
      ElementType::Int16 | ElementType::Float16 => 2,
      ElementType::Int32 | ElementType::Float32 => 4,
      ElementType::Int64 | ElementType::Float64 => 8,
    }
  }

  pub fn name(&self) -> &'static str {
    match self {
      ElementType::UInt8 => "uint8",
      ElementType::Int8 => "int8",
      ElementType::Int16 => "int16",
      ElementType::Int32 => "int32",
      ElementType::Int64 => "int64",
      ElementType::Float16 => "float16",
      ElementType::Float32 => "float32",
      ElementType::Float64 => "float64",
      ElementType::Bool => "bool",
    }
  }
}

impl fmt::Display for ElementType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for ElementType {
  type Err = EncodeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "uint8" | "u8" => Ok(ElementType::UInt8),
      "int8" | "i8" => Ok(ElementType::Int8),
      "int16" | "i16" => Ok(ElementType::Int16),
      "int32" | "i32" => Ok(ElementType::Int32),
      "int64" | "i64" => Ok(ElementType::Int64),
      "float16" | "f16" => Ok(ElementType::Float16),
      "float32" | "f32" => Ok(ElementType::Float32),
      "float64" | "f64" => Ok(ElementType::Float64),
      "bool" => Ok(ElementType::Bool),
      _ => Err(EncodeError::UnknownElementTypeName(s.to_string())),
    }
  }
}

/// 推理引擎声明的输入张量形状 `[1, side, side, channels]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputTensorSpec {
  pub side: u32,
  pub channels: usize,
  pub element_type: ElementType,
}

impl InputTensorSpec {
  pub fn new(side: u32, channels: usize, element_type: ElementType) -> Self {
    Self {
      side,
      channels,
      element_type,
    }
  }

  /// 编码后缓冲区的字节数
  pub fn encoded_len(&self) -> usize {
    let side = self.side as usize;
    side * side * ENCODED_CHANNELS * self.element_type.bytes_per_element()
  }
}

/// 与输入张量布局一致的字节缓冲区
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBuffer {
  element_type: ElementType,
  side: u32,
  data: Box<[u8]>,
}

impl EncodedBuffer {
  /// 长度必须等于 `side * side * 3 * bytes_per_element`，否则拒绝构造。
  /// 缓冲区只由 [`encode`] 产生。
  pub(crate) fn new(
    element_type: ElementType,
    side: u32,
    data: Vec<u8>,
  ) -> Result<Self, EncodeError> {
    let expected = InputTensorSpec::new(side, ENCODED_CHANNELS, element_type).encoded_len();
    if data.len() != expected {
      return Err(EncodeError::BufferLengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      element_type,
      side,
      data: data.into_boxed_slice(),
    })
  }

  pub fn element_type(&self) -> ElementType {
    self.element_type
  }

  pub fn side(&self) -> u32 {
    self.side
  }

  pub fn channels(&self) -> usize {
    ENCODED_CHANNELS
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn as_bytes(&self) -> &[u8] {
    &self.data
  }

  pub fn into_bytes(self) -> Box<[u8]> {
    self.data
  }
}

impl AsRef<[u8]> for EncodedBuffer {
  fn as_ref(&self) -> &[u8] {
    &self.data
  }
}

/// 按本机字节序解析 f32 序列
pub fn f32_from_ne_bytes(bytes: &[u8]) -> Result<Vec<f32>, EncodeError> {
  const F32_BYTES: usize = std::mem::size_of::<f32>();

  if bytes.len() % F32_BYTES != 0 {
    return Err(EncodeError::MisalignedFloatBytes(bytes.len()));
  }

  Ok(
    bytes
      .chunks_exact(F32_BYTES)
      .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect(),
  )
}

mod encode;
pub use self::encode::{encode, rasterize};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn element_sizes() {
    assert_eq!(ElementType::UInt8.bytes_per_element(), 1);
    assert_eq!(ElementType::Float16.bytes_per_element(), 2);
    assert_eq!(ElementType::Float32.bytes_per_element(), 4);
    assert_eq!(ElementType::Int64.bytes_per_element(), 8);
  }

  #[test]
  fn parse_element_type_names() {
    assert_eq!("float32".parse::<ElementType>(), Ok(ElementType::Float32));
    assert_eq!("UINT8".parse::<ElementType>(), Ok(ElementType::UInt8));
    assert!(matches!(
      "complex64".parse::<ElementType>(),
      Err(EncodeError::UnknownElementTypeName(_))
    ));
  }

  #[test]
  fn encoded_len_ignores_declared_channels() {
    let spec = InputTensorSpec::new(224, 4, ElementType::Float32);
    assert_eq!(spec.encoded_len(), 224 * 224 * 3 * 4);
  }

  #[test]
  fn buffer_length_is_checked() {
    let buf = EncodedBuffer::new(ElementType::Float32, 2, vec![0; 48]).unwrap();
    assert_eq!(buf.len(), 48);
    assert_eq!(buf.channels(), 3);
    assert_eq!(
      EncodedBuffer::new(ElementType::Float32, 2, vec![0; 12]),
      Err(EncodeError::BufferLengthMismatch {
        expected: 48,
        actual: 12
      })
    );
    assert!(EncodedBuffer::new(ElementType::UInt8, 0, Vec::new()).is_ok());
  }

  #[test]
  fn f32_bytes_decode() {
    let mut bytes = Vec::new();
    for v in [0.5f32, -1.25, 3.0] {
      bytes.extend_from_slice(&v.to_ne_bytes());
    }
    assert_eq!(f32_from_ne_bytes(&bytes).unwrap(), vec![0.5, -1.25, 3.0]);
    assert_eq!(
      f32_from_ne_bytes(&bytes[..5]),
      Err(EncodeError::MisalignedFloatBytes(5))
    );
  }
}
