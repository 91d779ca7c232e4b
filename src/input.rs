// 该文件是 Menpai （门牌） 项目的一部分。
// src/input.rs - 帧输入与预处理
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

use image::{RgbImage, imageops::FilterType};
use thiserror::Error;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbNhwcFrame};

pub trait AsNhwcFrame {
  fn as_nhwc(&self) -> &[u8];
}

/// 将传感器图像缩放为模型输入尺寸的 NHWC 帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
  width: u32,
  height: u32,
}

impl Preprocessor {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }

  pub fn input_size(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  pub fn prepare(&self, image: &RgbImage) -> RgbNhwcFrame {
    if image.dimensions() == (self.width, self.height) {
      return RgbNhwcFrame::from(image.clone());
    }

    let resized = image::imageops::resize(image, self.width, self.height, FilterType::Triangle);
    RgbNhwcFrame::from(resized)
  }
}

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  ReadImageFile(ImageFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() == ImageFileInput::SCHEME {
      let input = ImageFileInput::from_url(url)?;
      return Ok(InputWrapper::ReadImageFile(input));
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = crate::frame::ImageFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      InputWrapper::ReadImageFile(input) => input.next(),
    }
  }
}
