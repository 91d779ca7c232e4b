// 该文件是 Menpai （门牌） 项目的一部分。
// src/frame.rs - 传感器帧与 NHWC 输入帧
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

use std::ops::Deref;

use image::RgbImage;
use tracing::debug;

use crate::input::AsNhwcFrame;

const RGB_CHANNELS: usize = 3;

/// 送入推理引擎的 NHWC 排布 RGB 数据
#[derive(Debug, Clone)]
pub struct RgbNhwcFrame {
  width: usize,
  height: usize,
  data: Box<[u8]>,
}

impl RgbNhwcFrame {
  pub fn with_shape(height: usize, width: usize) -> Self {
    Self {
      width,
      height,
      data: vec![0u8; RGB_CHANNELS * width * height].into_boxed_slice(),
    }
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}

impl From<RgbImage> for RgbNhwcFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    // RgbImage 本身就是 HWC 排布
    Self {
      width: width as usize,
      height: height as usize,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

impl AsMut<[u8]> for RgbNhwcFrame {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

impl AsNhwcFrame for RgbNhwcFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

/// 外部持有的传感器帧，处理结束后必须恰好释放一次
pub trait SensorFrame: Send {
  fn index(&self) -> u64;
  fn image(&self) -> &RgbImage;
  /// 显示时需要顺时针旋转的角度
  fn rotation_degrees(&self) -> i32;
  /// 归还底层缓冲区
  fn release(&mut self);

  fn width(&self) -> u32 {
    self.image().width()
  }

  fn height(&self) -> u32 {
    self.image().height()
  }
}

/// 持有传感器帧，在任何退出路径上恰好释放一次
pub struct FrameGuard<F: SensorFrame> {
  frame: F,
  released: bool,
}

impl<F: SensorFrame> FrameGuard<F> {
  pub fn new(frame: F) -> Self {
    Self {
      frame,
      released: false,
    }
  }

  pub fn release(mut self) {
    self.release_once();
  }

  fn release_once(&mut self) {
    if !self.released {
      self.released = true;
      self.frame.release();
    }
  }
}

impl<F: SensorFrame> Deref for FrameGuard<F> {
  type Target = F;

  fn deref(&self) -> &Self::Target {
    &self.frame
  }
}

impl<F: SensorFrame> Drop for FrameGuard<F> {
  fn drop(&mut self) {
    self.release_once();
  }
}

/// 自带像素缓冲的帧，释放即丢弃像素数据
#[derive(Debug)]
pub struct ImageFrame {
  index: u64,
  image: RgbImage,
  rotation_degrees: i32,
}

impl ImageFrame {
  pub fn new(index: u64, image: RgbImage, rotation_degrees: i32) -> Self {
    Self {
      index,
      image,
      rotation_degrees,
    }
  }
}

impl SensorFrame for ImageFrame {
  fn index(&self) -> u64 {
    self.index
  }

  fn image(&self) -> &RgbImage {
    &self.image
  }

  fn rotation_degrees(&self) -> i32 {
    self.rotation_degrees
  }

  fn release(&mut self) {
    debug!("释放第 {} 帧缓冲区", self.index);
    self.image = RgbImage::new(0, 0);
  }
}
