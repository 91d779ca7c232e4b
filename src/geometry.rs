// 该文件是 Menpai （门牌） 项目的一部分。
// src/geometry.rs - 轴对齐边界框与 IoU
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

/// 轴对齐边界框，始终满足 `x1 <= x2` 且 `y1 <= y2`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
}

impl BBox {
  /// 由任意两个对角点构造，自动整理角点顺序
  pub fn from_corners(xa: f32, ya: f32, xb: f32, yb: f32) -> Self {
    Self {
      x1: xa.min(xb),
      y1: ya.min(yb),
      x2: xa.max(xb),
      y2: ya.max(yb),
    }
  }

  /// 由中心点和宽高构造
  pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
    let (hw, hh) = (w / 2.0, h / 2.0);
    Self::from_corners(cx - hw, cy - hh, cx + hw, cy + hh)
  }

  pub fn width(&self) -> f32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> f32 {
    self.y2 - self.y1
  }

  pub fn center(&self) -> (f32, f32) {
    ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  pub fn is_finite(&self) -> bool {
    self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
  }

  /// 按坐标轴分别缩放
  pub fn scaled(&self, sx: f32, sy: f32) -> Self {
    Self::from_corners(self.x1 * sx, self.y1 * sy, self.x2 * sx, self.y2 * sy)
  }

  /// 交并比，并集面积为 0 时返回 0
  pub fn iou(&self, other: &BBox) -> f32 {
    let inter_w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
    let inter_h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
    let intersection = inter_w * inter_h;
    let union = self.area() + other.area() - intersection;

    if union > 0.0 {
      intersection / union
    } else {
      0.0
    }
  }

  pub fn to_array(&self) -> [f32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn corners_are_ordered() {
    let b = BBox::from_corners(10.0, 8.0, 2.0, 4.0);
    assert_eq!(b.to_array(), [2.0, 4.0, 10.0, 8.0]);

    let b = BBox::from_center(5.0, 5.0, -4.0, 2.0);
    assert!(b.x1 <= b.x2 && b.y1 <= b.y2);
    assert_eq!(b.width(), 4.0);
  }

  #[test]
  fn iou_with_itself_is_one() {
    let b = BBox::from_center(33.3, 12.7, 17.1, 9.9);
    assert_eq!(b.iou(&b), 1.0);
  }

  #[test]
  fn iou_of_disjoint_boxes_is_zero() {
    let a = BBox::from_corners(0.0, 0.0, 10.0, 10.0);
    let b = BBox::from_corners(20.0, 20.0, 30.0, 30.0);
    assert_eq!(a.iou(&b), 0.0);

    // 仅共享一条边
    let c = BBox::from_corners(10.0, 0.0, 20.0, 10.0);
    assert_eq!(a.iou(&c), 0.0);
  }

  #[test]
  fn iou_of_degenerate_boxes_is_zero() {
    let p = BBox::from_corners(5.0, 5.0, 5.0, 5.0);
    assert_eq!(p.iou(&p), 0.0);
  }

  #[test]
  fn iou_partial_overlap() {
    let a = BBox::from_corners(0.0, 0.0, 10.0, 10.0);
    let b = BBox::from_corners(5.0, 0.0, 15.0, 10.0);
    // 交集 50，并集 150
    assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
  }
}
