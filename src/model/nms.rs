// 该文件是 Menpai （门牌） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use tracing::debug;

use crate::model::DetectItem;

/// 抑制范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuppressionPolicy {
  /// 跨类别抑制，不同类别的重叠框同样互相抑制
  #[default]
  Global,
  /// 只在同一类别内抑制
  PerClass,
}

impl SuppressionPolicy {
  fn applies<S>(self, kept: &DetectItem<S>, candidate: &DetectItem<S>) -> bool {
    match self {
      SuppressionPolicy::Global => true,
      SuppressionPolicy::PerClass => kept.class_id == candidate.class_id,
    }
  }
}

impl FromStr for SuppressionPolicy {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "global" => Ok(SuppressionPolicy::Global),
      "per-class" | "per_class" | "class" => Ok(SuppressionPolicy::PerClass),
      _ => Err(format!("未知的抑制策略: {s}，可选 global 或 per-class")),
    }
  }
}

/// 跨类别的贪心非极大值抑制
pub fn suppress<S>(candidates: Vec<DetectItem<S>>, iou_threshold: f32) -> Vec<DetectItem<S>> {
  suppress_with(candidates, iou_threshold, SuppressionPolicy::Global)
}

/// 按置信度降序（稳定排序，同分保持解码顺序）逐个检查，
/// 与任一已接受框的 IoU 严格大于阈值即丢弃
pub fn suppress_with<S>(
  mut candidates: Vec<DetectItem<S>>,
  iou_threshold: f32,
  policy: SuppressionPolicy,
) -> Vec<DetectItem<S>> {
  let total = candidates.len();
  candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  let mut accepted: Vec<DetectItem<S>> = Vec::with_capacity(total);
  for candidate in candidates {
    let covered = accepted
      .iter()
      .any(|kept| policy.applies(kept, &candidate) && kept.bbox.iou(&candidate.bbox) > iou_threshold);
    if !covered {
      accepted.push(candidate);
    }
  }

  debug!("NMS: {} 个候选框保留 {} 个", total, accepted.len());
  accepted
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{geometry::BBox, model::Candidate};

  fn item(class_id: u32, confidence: f32, bbox: [f32; 4]) -> Candidate {
    Candidate::new(
      class_id,
      Arc::from(format!("c{class_id}")),
      confidence,
      BBox::from_corners(bbox[0], bbox[1], bbox[2], bbox[3]),
    )
  }

  #[test]
  fn empty_input() {
    assert!(suppress(Vec::<Candidate>::new(), 0.5).is_empty());
  }

  #[test]
  fn overlapping_pair_keeps_higher_confidence() {
    // 交集 0.7 / 并集 1.0 => IoU = 0.7
    let a = item(0, 0.8, [0.0, 0.0, 85.0, 100.0]);
    let b = item(0, 0.9, [15.0, 0.0, 100.0, 100.0]);
    assert!((a.bbox.iou(&b.bbox) - 0.7).abs() < 1e-6);

    let kept = suppress(vec![a, b], 0.5);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].confidence, 0.9);
  }

  #[test]
  fn threshold_is_strict() {
    // IoU = 0.5 正好等于阈值，不抑制
    let a = item(0, 0.9, [0.0, 0.0, 30.0, 10.0]);
    let b = item(0, 0.8, [10.0, 0.0, 40.0, 10.0]);
    assert!((a.bbox.iou(&b.bbox) - 0.5).abs() < 1e-6);
    assert_eq!(suppress(vec![a, b], 0.5).len(), 2);
  }

  #[test]
  fn ties_resolved_by_decode_order() {
    let first = item(3, 0.7, [0.0, 0.0, 10.0, 10.0]);
    let second = item(4, 0.7, [1.0, 1.0, 11.0, 11.0]);
    let kept = suppress(vec![first, second], 0.3);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].class_id, 3);
  }

  #[test]
  fn global_policy_crosses_classes() {
    let a = item(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
    let b = item(1, 0.6, [0.0, 0.0, 10.0, 10.0]);
    assert_eq!(suppress_with(vec![a.clone(), b.clone()], 0.5, SuppressionPolicy::Global).len(), 1);

    let kept = suppress_with(vec![a, b], 0.5, SuppressionPolicy::PerClass);
    assert_eq!(kept.len(), 2);
    assert_eq!(kept[0].class_id, 0);
  }

  #[test]
  fn output_is_sorted_and_keeps_the_best() {
    let input = vec![
      item(0, 0.3, [50.0, 50.0, 60.0, 60.0]),
      item(0, 0.6, [0.0, 0.0, 10.0, 10.0]),
      item(0, 0.95, [1.0, 1.0, 10.0, 10.0]),
      item(0, 0.5, [100.0, 0.0, 110.0, 10.0]),
    ];
    let kept = suppress(input, 0.5);
    let scores: Vec<f32> = kept.iter().map(|k| k.confidence).collect();
    assert_eq!(scores, [0.95, 0.5, 0.3]);
  }

  #[test]
  fn no_surviving_pair_exceeds_threshold() {
    let mut input = Vec::new();
    for i in 0..40 {
      let x = (i % 8) as f32 * 7.0;
      let y = (i / 8) as f32 * 5.0;
      input.push(item(i % 3, 0.2 + (i as f32 * 0.37) % 0.8, [x, y, x + 20.0, y + 15.0]));
    }
    let kept = suppress(input, 0.4);
    for (i, a) in kept.iter().enumerate() {
      for b in kept.iter().skip(i + 1) {
        assert!(a.bbox.iou(&b.bbox) <= 0.4);
      }
    }
  }

  #[test]
  fn policy_from_str() {
    assert_eq!("global".parse::<SuppressionPolicy>(), Ok(SuppressionPolicy::Global));
    assert_eq!("per-class".parse::<SuppressionPolicy>(), Ok(SuppressionPolicy::PerClass));
    assert!("nearest".parse::<SuppressionPolicy>().is_err());
  }
}
