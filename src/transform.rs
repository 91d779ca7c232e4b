// 该文件是 Menpai （门牌） 项目的一部分。
// src/transform.rs - 传感器坐标到显示表面坐标的映射
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

use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::{
  geometry::BBox,
  model::{Candidate, FinalBox},
};

#[derive(Error, Debug, PartialEq)]
pub enum TransformError {
  #[error("不支持的旋转角度: {0}，必须是 90 的整数倍")]
  InvalidRotation(i32),
  #[error("源图像尺寸无效: {0}x{1}")]
  EmptySource(u32, u32),
  #[error("显示表面尺寸无效: {0}x{1}")]
  EmptySurface(u32, u32),
}

/// 缩放适配策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FitPolicy {
  /// 等比缩小到完整放入，必要时留边
  #[default]
  Letterbox,
  /// 等比放大到铺满，超出部分被裁剪
  Fill,
}

impl FromStr for FitPolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "letterbox" | "fit" => Ok(FitPolicy::Letterbox),
      "fill" | "crop" => Ok(FitPolicy::Fill),
      _ => Err(format!("未知的适配策略: {s}，可选 letterbox 或 fill")),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
  Deg0,
  Deg90,
  Deg180,
  Deg270,
}

impl Rotation {
  /// 角度按 360 取模，允许负值
  pub fn from_degrees(degrees: i32) -> Result<Self, TransformError> {
    match degrees.rem_euclid(360) {
      0 => Ok(Rotation::Deg0),
      90 => Ok(Rotation::Deg90),
      180 => Ok(Rotation::Deg180),
      270 => Ok(Rotation::Deg270),
      _ => Err(TransformError::InvalidRotation(degrees)),
    }
  }

  pub fn degrees(self) -> u32 {
    match self {
      Rotation::Deg0 => 0,
      Rotation::Deg90 => 90,
      Rotation::Deg180 => 180,
      Rotation::Deg270 => 270,
    }
  }

  pub fn swaps_axes(self) -> bool {
    matches!(self, Rotation::Deg90 | Rotation::Deg270)
  }
}

/// 显示表面的像素尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
  pub width: u32,
  pub height: u32,
}

impl SurfaceSize {
  pub fn new(width: u32, height: u32) -> Self {
    Self { width, height }
  }
}

impl Default for SurfaceSize {
  fn default() -> Self {
    Self::new(1080, 1920)
  }
}

/// 每帧的几何信息，不跨帧缓存
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformContext {
  pub source_width: u32,
  pub source_height: u32,
  pub rotation_degrees: i32,
  pub dest_width: u32,
  pub dest_height: u32,
}

impl TransformContext {
  pub fn new(source: (u32, u32), rotation_degrees: i32, surface: SurfaceSize) -> Self {
    Self {
      source_width: source.0,
      source_height: source.1,
      rotation_degrees,
      dest_width: surface.width,
      dest_height: surface.height,
    }
  }
}

/// 由一帧的几何信息推导出的旋转、缩放与偏移，帧内所有框共用
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceTransform {
  rotation: Rotation,
  source_width: f32,
  source_height: f32,
  scale: f32,
  offset_x: f32,
  offset_y: f32,
}

impl SurfaceTransform {
  pub fn new(ctx: &TransformContext, fit: FitPolicy) -> Result<Self, TransformError> {
    let rotation = Rotation::from_degrees(ctx.rotation_degrees)?;
    if ctx.source_width == 0 || ctx.source_height == 0 {
      return Err(TransformError::EmptySource(ctx.source_width, ctx.source_height));
    }
    if ctx.dest_width == 0 || ctx.dest_height == 0 {
      return Err(TransformError::EmptySurface(ctx.dest_width, ctx.dest_height));
    }

    let (source_width, source_height) = (ctx.source_width as f32, ctx.source_height as f32);
    let (rotated_w, rotated_h) = if rotation.swaps_axes() {
      (source_height, source_width)
    } else {
      (source_width, source_height)
    };
    let (dest_w, dest_h) = (ctx.dest_width as f32, ctx.dest_height as f32);

    let (sx, sy) = (dest_w / rotated_w, dest_h / rotated_h);
    let scale = match fit {
      FitPolicy::Letterbox => sx.min(sy),
      FitPolicy::Fill => sx.max(sy),
    };
    let offset_x = (dest_w - rotated_w * scale) / 2.0;
    let offset_y = (dest_h - rotated_h * scale) / 2.0;

    debug!(
      "表面映射: 旋转 {}°, 缩放 {:.4}, 偏移 ({:.1}, {:.1})",
      rotation.degrees(),
      scale,
      offset_x,
      offset_y
    );

    Ok(Self {
      rotation,
      source_width,
      source_height,
      scale,
      offset_x,
      offset_y,
    })
  }

  pub fn rotation(&self) -> Rotation {
    self.rotation
  }

  pub fn scale(&self) -> f32 {
    self.scale
  }

  pub fn offset_x(&self) -> f32 {
    self.offset_x
  }

  pub fn offset_y(&self) -> f32 {
    self.offset_y
  }

  /// 旋转后的源图像尺寸
  pub fn rotated_source_size(&self) -> (f32, f32) {
    if self.rotation.swaps_axes() {
      (self.source_height, self.source_width)
    } else {
      (self.source_width, self.source_height)
    }
  }

  /// 未旋转源图像中的点映射到旋转后的帧
  pub fn rotate_point(&self, px: f32, py: f32) -> (f32, f32) {
    let (w, h) = (self.source_width, self.source_height);
    match self.rotation {
      Rotation::Deg0 => (px, py),
      Rotation::Deg90 => (py, w - px),
      Rotation::Deg180 => (w - px, h - py),
      Rotation::Deg270 => (h - py, px),
    }
  }

  pub fn map_point(&self, px: f32, py: f32) -> (f32, f32) {
    let (rx, ry) = self.rotate_point(px, py);
    (rx * self.scale + self.offset_x, ry * self.scale + self.offset_y)
  }

  pub fn map_bbox(&self, bbox: &BBox) -> BBox {
    let (ax, ay) = self.map_point(bbox.x1, bbox.y1);
    let (bx, by) = self.map_point(bbox.x2, bbox.y2);
    BBox::from_corners(ax, ay, bx, by)
  }
}

/// 将一帧的候选框映射到显示表面坐标
pub fn map_to_surface(
  boxes: Vec<Candidate>,
  ctx: &TransformContext,
  fit: FitPolicy,
) -> Result<Vec<FinalBox>, TransformError> {
  let transform = SurfaceTransform::new(ctx, fit)?;
  Ok(
    boxes
      .into_iter()
      .map(|candidate| {
        let bbox = transform.map_bbox(&candidate.bbox);
        candidate.into_space(bbox)
      })
      .collect(),
  )
}
