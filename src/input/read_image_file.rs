// 该文件是 Shanlan （山岚） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::ArgbImage, url_path};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 解码图像文件为 ARGB 像素
pub fn decode_image_file(path: &str) -> Result<ArgbImage, ImageFileInputError> {
  let image = ImageReader::open(path)?
    .with_guessed_format()?
    .decode()?
    .to_rgba8();
  debug!(
    "图像解码完成: {} ({}x{})",
    path,
    image.width(),
    image.height()
  );
  Ok(ArgbImage::from(image))
}

/// 单张图像输入，迭代一次后结束
pub struct ImageFileInput {
  image: Option<ArgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    Self::open(&url_path(url))
  }
}

impl ImageFileInput {
  pub fn open(path: &str) -> Result<Self, ImageFileInputError> {
    Ok(ImageFileInput {
      image: Some(decode_image_file(path)?),
    })
  }
}

impl Iterator for ImageFileInput {
  type Item = ArgbImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}
