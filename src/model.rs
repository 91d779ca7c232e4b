// 该文件是 Menpai （门牌） 项目的一部分。
// src/model.rs - 模型与检测结果
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

use std::{marker::PhantomData, sync::Arc};

use crate::geometry::BBox;

/// 推理引擎：张量进，张量出
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;

  /// 引擎声明的输出元素个数，未知时返回 `None`
  fn output_len(&self) -> Option<usize> {
    None
  }
}

/// 模型/传感器坐标空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpace;

/// 目标显示表面坐标空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSpace;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem<S> {
  pub class_id: u32,
  pub label: Arc<str>,
  pub confidence: f32,
  pub bbox: BBox,
  _space: PhantomData<S>,
}

/// 解码得到、尚未映射的候选框
pub type Candidate = DetectItem<SourceSpace>;
/// 经过抑制与坐标映射的最终框
pub type FinalBox = DetectItem<SurfaceSpace>;

impl<S> DetectItem<S> {
  pub fn new(class_id: u32, label: Arc<str>, confidence: f32, bbox: BBox) -> Self {
    Self {
      class_id,
      label,
      confidence,
      bbox,
      _space: PhantomData,
    }
  }

  pub fn center(&self) -> (f32, f32) {
    self.bbox.center()
  }

  pub fn size(&self) -> (f32, f32) {
    (self.bbox.width(), self.bbox.height())
  }

  /// 渲染用的标签文本
  pub fn caption(&self) -> String {
    format!("{} {:.2}", self.label, self.confidence)
  }

  /// 替换坐标并切换到另一个坐标空间
  pub fn into_space<T>(self, bbox: BBox) -> DetectItem<T> {
    DetectItem {
      class_id: self.class_id,
      label: self.label,
      confidence: self.confidence,
      bbox,
      _space: PhantomData,
    }
  }
}

impl Candidate {
  pub fn scaled(self, sx: f32, sy: f32) -> Self {
    let bbox = self.bbox.scaled(sx, sy);
    self.into_space(bbox)
  }
}

/// 单帧的最终结果快照，发布后不再修改
#[derive(Debug, Clone)]
pub struct DetectResult {
  pub frame_index: u64,
  pub surface: (u32, u32),
  pub items: Arc<[FinalBox]>,
}

impl DetectResult {
  pub fn new(frame_index: u64, surface: (u32, u32), items: Vec<FinalBox>) -> Self {
    Self {
      frame_index,
      surface,
      items: items.into(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

mod decode;
mod engine;
mod layout;
mod nms;
mod replay;
#[cfg(feature = "backend-rknpu")]
mod rknn;

pub use self::decode::{DecodeError, Decoder, decode};
pub use self::engine::{EngineBuilder, EngineError, EngineWrapper};
pub use self::layout::{BoxUnits, LayoutError, TensorLayout};
pub use self::nms::{SuppressionPolicy, suppress, suppress_with};
pub use self::replay::ReplayEngine;
#[cfg(feature = "backend-rknpu")]
pub use self::rknn::RknnEngine;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caption_uses_two_decimals() {
    let item = FinalBox::new(1, Arc::from("room 101"), 0.7234, BBox::from_corners(0.0, 0.0, 1.0, 1.0));
    assert_eq!(item.caption(), "room 101 0.72");
  }

  #[test]
  fn into_space_keeps_identity() {
    let candidate = Candidate::new(2, Arc::from("door"), 0.5, BBox::from_center(10.0, 10.0, 4.0, 2.0));
    assert_eq!(candidate.center(), (10.0, 10.0));
    assert_eq!(candidate.size(), (4.0, 2.0));

    let moved: FinalBox = candidate.into_space(BBox::from_corners(1.0, 2.0, 3.0, 4.0));
    assert_eq!(moved.class_id, 2);
    assert_eq!(moved.label.as_ref(), "door");
    assert_eq!(moved.bbox.to_array(), [1.0, 2.0, 3.0, 4.0]);
  }
}
