// 该文件是 Menpai （门牌） 项目的一部分。
// src/model/decode.rs - 检测张量解码
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

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::{
  geometry::BBox,
  label::{LabelError, LabelTable},
  model::{
    Candidate,
    layout::{BoxUnits, ROW_HEADER_LEN, TensorLayout},
  },
};

const OBJECTNESS_INDEX: usize = 4;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("引擎输出长度 {actual} 与模型布局不符, 期望 {expected}")]
  UnexpectedLength { expected: usize, actual: usize },
  #[error("锚点 {anchor} 的置信度不是有限值: {confidence}")]
  NonFiniteConfidence { anchor: usize, confidence: f32 },
  #[error("锚点 {anchor} 的边界框包含非有限值")]
  NonFiniteBox { anchor: usize },
}

/// 绑定了模型布局、标签与置信度下限的解码器
#[derive(Debug, Clone)]
pub struct Decoder {
  layout: TensorLayout,
  labels: LabelTable,
  objectness_floor: f32,
  combined_floor: f32,
}

impl Decoder {
  /// 标签数必须与类别数一致，否则视为启动错误
  pub fn new(
    layout: TensorLayout,
    labels: LabelTable,
    objectness_floor: f32,
    combined_floor: f32,
  ) -> Result<Self, LabelError> {
    labels.ensure_len(layout.num_classes())?;
    Ok(Self {
      layout,
      labels,
      objectness_floor,
      combined_floor,
    })
  }

  pub fn layout(&self) -> &TensorLayout {
    &self.layout
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  pub fn decode(&self, tensor: &[f32]) -> Result<Vec<Candidate>, DecodeError> {
    decode(
      tensor,
      &self.layout,
      &self.labels,
      self.objectness_floor,
      self.combined_floor,
    )
  }
}

/// 返回最大值及其下标，相等时取第一个
fn argmax(scores: &[f32]) -> (usize, f32) {
  let mut best = (0, scores.first().copied().unwrap_or(0.0));
  for (idx, &score) in scores.iter().enumerate().skip(1) {
    if score > best.1 {
      best = (idx, score);
    }
  }
  best
}

/// 将原始检测张量解码为候选框，坐标为模型输入像素单位。
///
/// 长度与布局不符时返回 [`DecodeError::UnexpectedLength`]，不解码任何锚点。
pub fn decode(
  tensor: &[f32],
  layout: &TensorLayout,
  labels: &LabelTable,
  objectness_floor: f32,
  combined_floor: f32,
) -> Result<Vec<Candidate>, DecodeError> {
  if layout.validate_len(tensor.len()).is_err() {
    return Err(DecodeError::UnexpectedLength {
      expected: layout.tensor_len(),
      actual: tensor.len(),
    });
  }

  let (iw, ih) = (layout.input_width() as f32, layout.input_height() as f32);
  let mut items = Vec::new();

  for (anchor, row) in tensor.chunks_exact(layout.stride()).enumerate() {
    let objectness = row[OBJECTNESS_INDEX];
    if objectness < objectness_floor {
      continue;
    }

    let (class_id, class_score) = argmax(&row[ROW_HEADER_LEN..]);
    let confidence = objectness * class_score;
    if !confidence.is_finite() {
      return Err(DecodeError::NonFiniteConfidence { anchor, confidence });
    }
    if confidence < combined_floor {
      continue;
    }

    let (cx, cy, w, h) = match layout.units() {
      BoxUnits::Pixels => (row[0], row[1], row[2], row[3]),
      BoxUnits::Normalized => (row[0] * iw, row[1] * ih, row[2] * iw, row[3] * ih),
    };
    let bbox = BBox::from_center(cx, cy, w, h);
    if !bbox.is_finite() {
      return Err(DecodeError::NonFiniteBox { anchor });
    }

    let label = labels
      .get(class_id)
      .cloned()
      .unwrap_or_else(|| Arc::from("unknown"));
    items.push(Candidate::new(class_id as u32, label, confidence, bbox));
  }

  debug!("解码得到 {} 个候选框", items.len());
  Ok(items)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn layout(anchors: usize, classes: usize, units: BoxUnits) -> TensorLayout {
    TensorLayout::new(anchors, classes, 640, 640, units).unwrap()
  }

  fn labels() -> LabelTable {
    LabelTable::from_names(["plate", "door", "exit"])
  }

  #[test]
  fn decodes_best_class_and_rejects_low_objectness() {
    let tensor = [
      320.0, 240.0, 100.0, 50.0, 0.9, 0.1, 0.8, 0.05, //
      100.0, 100.0, 20.0, 20.0, 0.1, 0.9, 0.9, 0.9,
    ];
    let decoder = Decoder::new(layout(2, 3, BoxUnits::Pixels), labels(), 0.25, 0.5).unwrap();
    let items = decoder.decode(&tensor).unwrap();

    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.class_id, 1);
    assert_eq!(item.label.as_ref(), "door");
    assert!((item.confidence - 0.72).abs() < 1e-6);
    assert_eq!(item.bbox.to_array(), [270.0, 215.0, 370.0, 265.0]);
  }

  #[test]
  fn rejects_below_combined_floor() {
    // 0.6 * 0.7 = 0.42 < 0.5
    let tensor = [10.0, 10.0, 4.0, 4.0, 0.6, 0.7, 0.0, 0.0];
    let items = decode(&tensor, &layout(1, 3, BoxUnits::Pixels), &labels(), 0.25, 0.5).unwrap();
    assert!(items.is_empty());
  }

  #[test]
  fn argmax_first_index_wins_on_tie() {
    assert_eq!(argmax(&[0.5, 0.7, 0.7, 0.1]), (1, 0.7));
    assert_eq!(argmax(&[0.3, 0.3]), (0, 0.3));
  }

  #[test]
  fn normalized_units_scale_to_input() {
    let tensor = [0.5, 0.5, 0.25, 0.5, 1.0, 0.0, 0.0, 1.0];
    let items = decode(&tensor, &layout(1, 3, BoxUnits::Normalized), &labels(), 0.25, 0.5).unwrap();
    assert_eq!(items[0].bbox.to_array(), [240.0, 160.0, 400.0, 480.0]);
    assert_eq!(items[0].label.as_ref(), "exit");
  }

  #[test]
  fn corner_and_confidence_invariants_hold() {
    let mut tensor = Vec::new();
    for i in 0..50 {
      let f = i as f32 / 50.0;
      tensor.extend_from_slice(&[f * 600.0, 300.0 - f * 100.0, (f - 0.5) * 80.0, 30.0 - f * 60.0]);
      tensor.extend_from_slice(&[1.0 - f * 0.5, f, 1.0 - f, (f * 7.0) % 1.0]);
    }
    let items = decode(&tensor, &layout(50, 3, BoxUnits::Pixels), &labels(), 0.0, 0.0).unwrap();
    assert_eq!(items.len(), 50);
    for item in &items {
      assert!(item.bbox.x1 <= item.bbox.x2);
      assert!(item.bbox.y1 <= item.bbox.y2);
      assert!((0.0..=1.0).contains(&item.confidence));
    }
  }

  #[test]
  fn non_finite_confidence_is_an_error() {
    let tensor = [10.0, 10.0, 4.0, 4.0, f32::NAN, 0.9, 0.0, 0.0];
    let err = decode(&tensor, &layout(1, 3, BoxUnits::Pixels), &labels(), 0.25, 0.5).unwrap_err();
    assert!(matches!(err, DecodeError::NonFiniteConfidence { anchor: 0, .. }));
  }

  #[test]
  fn unexpected_length_is_reported_per_frame() {
    let decoder = Decoder::new(layout(2, 3, BoxUnits::Pixels), labels(), 0.25, 0.5).unwrap();
    let err = decoder.decode(&[0.0; 8]).unwrap_err();
    assert!(matches!(
      err,
      DecodeError::UnexpectedLength {
        expected: 16,
        actual: 8
      }
    ));
  }

  #[test]
  fn ragged_tail_is_not_ignored() {
    // 一整行加三个多余元素
    let tensor = [10.0, 10.0, 4.0, 4.0, 0.9, 0.9, 0.0, 0.0, 1.0, 1.0, 1.0];
    let err = decode(&tensor, &layout(1, 3, BoxUnits::Pixels), &labels(), 0.25, 0.5).unwrap_err();
    assert!(matches!(
      err,
      DecodeError::UnexpectedLength {
        expected: 8,
        actual: 11
      }
    ));
  }

  #[test]
  fn label_count_must_match_classes() {
    let err = Decoder::new(layout(2, 4, BoxUnits::Pixels), labels(), 0.25, 0.5).unwrap_err();
    assert!(matches!(err, LabelError::CountMismatch { expected: 4, actual: 3 }));
  }
}
