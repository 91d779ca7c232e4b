// 该文件是 Menpai （门牌） 项目的一部分。
// src/output/draw.rs - 检测框叠加层绘制
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgba, RgbaImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};

use crate::{
  model::{DetectResult, FinalBox},
  transform::SurfaceSize,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 2;
const BOX_COLOR: Rgba<u8> = Rgba([0, 0, 255, 255]); // 蓝色
const TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// 在透明画布上绘制检测框与标签；坐标已是表面像素，这里只做裁剪
pub struct Draw {
  font_size: f32,
  font: Option<FontArc>,
  box_color: Rgba<u8>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      font: None,
      box_color: BOX_COLOR,
    }
  }
}

impl Draw {
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  pub fn draw_overlay(&self, surface: SurfaceSize, result: &DetectResult) -> RgbaImage {
    let mut canvas = RgbaImage::new(surface.width, surface.height);
    for item in result.items.iter() {
      self.draw_bbox_with_label(&mut canvas, item);
    }
    canvas
  }

  fn draw_bbox_with_label(&self, canvas: &mut RgbaImage, item: &FinalBox) {
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    if w == 0 || h == 0 {
      return;
    }

    let x_min = (item.bbox.x1.floor() as i32).clamp(0, w - 1);
    let y_min = (item.bbox.y1.floor() as i32).clamp(0, h - 1);
    let x_max = (item.bbox.x2.ceil() as i32).clamp(0, w - 1);
    let y_max = (item.bbox.y2.ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 边框加粗为 2 像素
    for t in 0..BOX_THICKNESS {
      let (rw, rh) = (x_max - x_min - 2 * t + 1, y_max - y_min - 2 * t + 1);
      if rw <= 0 || rh <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(rw as u32, rh as u32);
      draw_hollow_rect_mut(canvas, rect, self.box_color);
    }

    let Some(font) = &self.font else {
      return;
    };

    let caption = item.caption();
    let scale = PxScale::from(self.font_size);
    let (text_w, text_h) = text_size(scale, font, &caption);
    let label_h = text_h as i32 + 2 * LABEL_TEXT_VERTICAL_PADDING;

    // 标签锚定在左上角上方，空间不足时贴住画布顶部
    let label_x = x_min;
    let label_y = (y_min - label_h).max(0);
    let label_w = (text_w as i32).min(w - label_x);

    if label_w > 0 && label_h > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_w as u32, label_h as u32);
      draw_filled_rect_mut(canvas, rect, self.box_color);
      draw_text_mut(
        canvas,
        TEXT_COLOR,
        label_x,
        label_y + LABEL_TEXT_VERTICAL_PADDING,
        scale,
        font,
        &caption,
      );
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{geometry::BBox, model::FinalBox};

  fn result(bbox: BBox) -> DetectResult {
    DetectResult::new(0, (40, 30), vec![FinalBox::new(0, "plate".into(), 0.9, bbox)])
  }

  #[test]
  fn draws_outline_on_transparent_canvas() {
    let draw = Draw::default();
    let canvas = draw.draw_overlay(
      SurfaceSize::new(40, 30),
      &result(BBox::from_corners(10.0, 5.0, 20.0, 15.0)),
    );
    assert_eq!(canvas.dimensions(), (40, 30));
    assert_eq!(*canvas.get_pixel(10, 10), BOX_COLOR);
    assert_eq!(*canvas.get_pixel(11, 10), BOX_COLOR);
    assert_eq!(*canvas.get_pixel(15, 10), Rgba([0, 0, 0, 0]));
    assert_eq!(*canvas.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
  }

  #[test]
  fn boxes_outside_the_surface_are_clipped() {
    let draw = Draw::default();
    let canvas = draw.draw_overlay(
      SurfaceSize::new(40, 30),
      &result(BBox::from_corners(-50.0, -50.0, -10.0, -10.0)),
    );
    assert!(canvas.pixels().all(|p| p[3] == 0));

    let empty = draw.draw_overlay(SurfaceSize::new(0, 0), &result(BBox::from_corners(0.0, 0.0, 1.0, 1.0)));
    assert_eq!(empty.dimensions(), (0, 0));
  }
}
