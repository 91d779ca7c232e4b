// 该文件是 Menpai （门牌） 项目的一部分。
// src/config.rs - 流水线参数配置
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

use thiserror::Error;

use crate::{model::SuppressionPolicy, transform::FitPolicy};

const DEFAULT_OBJECTNESS_FLOOR: f32 = 0.25;
const DEFAULT_COMBINED_FLOOR: f32 = 0.5;
const DEFAULT_IOU_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("{name} 必须在 [0, 1] 范围内, 实际为 {value}")]
  OutOfRange { name: &'static str, value: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
  /// objectness 下限，低于该值的锚点在扫描类别前即被丢弃
  pub objectness_floor: f32,
  /// objectness × 类别分数的下限
  pub combined_floor: f32,
  /// NMS IoU 阈值
  pub iou_threshold: f32,
  pub suppression: SuppressionPolicy,
  pub fit: FitPolicy,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      objectness_floor: DEFAULT_OBJECTNESS_FLOOR,
      combined_floor: DEFAULT_COMBINED_FLOOR,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      suppression: SuppressionPolicy::default(),
      fit: FitPolicy::default(),
    }
  }
}

impl PipelineConfig {
  pub fn with_floors(mut self, objectness_floor: f32, combined_floor: f32) -> Self {
    self.objectness_floor = objectness_floor;
    self.combined_floor = combined_floor;
    self
  }

  pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
    self.iou_threshold = iou_threshold;
    self
  }

  pub fn with_suppression(mut self, suppression: SuppressionPolicy) -> Self {
    self.suppression = suppression;
    self
  }

  pub fn with_fit(mut self, fit: FitPolicy) -> Self {
    self.fit = fit;
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    for (name, value) in [
      ("objectness_floor", self.objectness_floor),
      ("combined_floor", self.combined_floor),
      ("iou_threshold", self.iou_threshold),
    ] {
      // NaN 也会在这里被拒绝
      if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::OutOfRange { name, value });
      }
    }
    Ok(())
  }
}
