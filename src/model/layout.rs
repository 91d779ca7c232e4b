// 该文件是 Menpai （门牌） 项目的一部分。
// src/model/layout.rs - 输出张量布局
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
use url::Url;

use crate::query_param;

/// 每个锚点行的固定字段数: cx, cy, w, h, objectness
pub const ROW_HEADER_LEN: usize = 5;

#[derive(Error, Debug)]
pub enum LayoutError {
  #[error("{0} 必须大于 0")]
  Zero(&'static str),
  #[error("缺少模型参数: {0}")]
  MissingParam(&'static str),
  #[error("模型参数 {name} 无效: {value}")]
  InvalidParam { name: &'static str, value: String },
  #[error("未知的坐标单位: {0}，可选 pixels 或 normalized")]
  UnknownUnits(String),
  #[error("张量长度 {len} 不是行宽 {stride} 的整数倍")]
  Ragged { len: usize, stride: usize },
  #[error("张量锚点数不符: 期望 {expected}, 实际 {actual}")]
  AnchorMismatch { expected: usize, actual: usize },
}

/// 张量中框坐标的单位，必须由模型约定给出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxUnits {
  /// 已是模型输入像素单位
  Pixels,
  /// `[0, 1]` 归一化，需乘以模型输入尺寸
  Normalized,
}

impl FromStr for BoxUnits {
  type Err = LayoutError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "pixels" | "pixel" | "px" => Ok(BoxUnits::Pixels),
      "normalized" | "norm" => Ok(BoxUnits::Normalized),
      _ => Err(LayoutError::UnknownUnits(s.to_string())),
    }
  }
}

/// 形如 `[1, num_anchors, 5 + num_classes]` 的行主序 f32 张量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TensorLayout {
  num_anchors: usize,
  num_classes: usize,
  input_width: u32,
  input_height: u32,
  units: BoxUnits,
}

impl TensorLayout {
  pub fn new(
    num_anchors: usize,
    num_classes: usize,
    input_width: u32,
    input_height: u32,
    units: BoxUnits,
  ) -> Result<Self, LayoutError> {
    if num_anchors == 0 {
      return Err(LayoutError::Zero("anchors"));
    }
    if num_classes == 0 {
      return Err(LayoutError::Zero("classes"));
    }
    if input_width == 0 {
      return Err(LayoutError::Zero("width"));
    }
    if input_height == 0 {
      return Err(LayoutError::Zero("height"));
    }

    Ok(Self {
      num_anchors,
      num_classes,
      input_width,
      input_height,
      units,
    })
  }

  /// 从模型 URL 的查询参数读取布局，
  /// 例如 `?anchors=8400&classes=80&units=pixels&width=640&height=640`
  pub fn from_query(url: &Url) -> Result<Self, LayoutError> {
    fn required<T: FromStr>(url: &Url, name: &'static str) -> Result<T, LayoutError> {
      match query_param::<T>(url, name) {
        Some(Ok(v)) => Ok(v),
        Some(Err(value)) => Err(LayoutError::InvalidParam { name, value }),
        None => Err(LayoutError::MissingParam(name)),
      }
    }

    let units = match url.query_pairs().find(|(k, _)| k == "units") {
      Some((_, v)) => v.parse::<BoxUnits>()?,
      None => return Err(LayoutError::MissingParam("units")),
    };

    Self::new(
      required(url, "anchors")?,
      required(url, "classes")?,
      required(url, "width")?,
      required(url, "height")?,
      units,
    )
  }

  pub fn num_anchors(&self) -> usize {
    self.num_anchors
  }

  pub fn num_classes(&self) -> usize {
    self.num_classes
  }

  pub fn input_width(&self) -> u32 {
    self.input_width
  }

  pub fn input_height(&self) -> u32 {
    self.input_height
  }

  pub fn units(&self) -> BoxUnits {
    self.units
  }

  /// 每个锚点行的元素个数
  pub fn stride(&self) -> usize {
    ROW_HEADER_LEN + self.num_classes
  }

  pub fn tensor_len(&self) -> usize {
    self.num_anchors * self.stride()
  }

  /// 启动时校验引擎输出长度与布局一致
  pub fn validate_len(&self, len: usize) -> Result<(), LayoutError> {
    let stride = self.stride();
    if len % stride != 0 {
      return Err(LayoutError::Ragged { len, stride });
    }
    if len / stride != self.num_anchors {
      return Err(LayoutError::AnchorMismatch {
        expected: self.num_anchors,
        actual: len / stride,
      });
    }
    Ok(())
  }
}
