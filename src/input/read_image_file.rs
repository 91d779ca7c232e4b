// 该文件是 Menpai （门牌） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::ImageFrame, query_param};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("Invalid query parameter {0}: {1}")]
  InvalidParam(&'static str, String),
}

/// 读取一张图片，并作为传感器帧重复输出 `repeat` 次
pub struct ImageFileInput {
  image: RgbImage,
  rotation_degrees: i32,
  repeat: u64,
  next_index: u64,
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

    let rotation_degrees = match query_param::<i32>(url, "rotation") {
      Some(Ok(v)) => v,
      Some(Err(v)) => return Err(ImageFileInputError::InvalidParam("rotation", v)),
      None => 0,
    };
    let repeat = match query_param::<u64>(url, "repeat") {
      Some(Ok(v)) => v,
      Some(Err(v)) => return Err(ImageFileInputError::InvalidParam("repeat", v)),
      None => 1,
    };

    let path = url.path();
    info!("读取输入图像: {}", path);
    let image = ImageReader::open(path)?.decode()?.to_rgb8();

    Ok(Self::new(image, rotation_degrees, repeat))
  }
}

impl ImageFileInput {
  pub fn new(image: RgbImage, rotation_degrees: i32, repeat: u64) -> Self {
    Self {
      image,
      rotation_degrees,
      repeat,
      next_index: 0,
    }
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.image.dimensions()
  }
}

impl Iterator for ImageFileInput {
  type Item = ImageFrame;

  fn next(&mut self) -> Option<Self::Item> {
    if self.next_index >= self.repeat {
      return None;
    }
    let index = self.next_index;
    self.next_index += 1;
    Some(ImageFrame::new(index, self.image.clone(), self.rotation_degrees))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::SensorFrame;

  #[test]
  fn reads_image_with_rotation_and_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    RgbImage::from_pixel(6, 4, image::Rgb([9, 9, 9])).save(&path).unwrap();

    let url = Url::parse(&format!("image://{}?rotation=90&repeat=3", path.display())).unwrap();
    let input = ImageFileInput::from_url(&url).unwrap();
    assert_eq!(input.dimensions(), (6, 4));

    let frames: Vec<ImageFrame> = input.collect();
    assert_eq!(frames.len(), 3);
    assert_eq!(frames[2].index(), 2);
    assert_eq!(frames[0].rotation_degrees(), 90);
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("video:///tmp/a.mp4").unwrap();
    assert!(matches!(
      ImageFileInput::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
