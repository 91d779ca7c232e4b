// 该文件是 Menpai （门牌） 项目的一部分。
// src/output/save_image_file.rs - 保存叠加层图像文件
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

use std::path::Path;

use ab_glyph::FontArc;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::DetectResult,
  output::{Render, draw::Draw, surface_from_query},
  transform::SurfaceSize,
};

pub struct SaveImageFileOutput {
  path: String,
  surface: SurfaceSize,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("字体文件无效: {0}")]
  FontError(String),
  #[error("无效的查询参数 {0}: {1}")]
  InvalidParam(&'static str, String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let surface = surface_from_query(uri)
      .map_err(|(name, value)| SaveImageFileError::InvalidParam(name, value))?;

    let mut draw = Draw::default();
    if let Some((_, font_path)) = uri.query_pairs().find(|(k, _)| k == "font") {
      info!("加载标签字体: {}", font_path);
      let data = std::fs::read(&*font_path).map_err(SaveImageFileError::IoError)?;
      let font = FontArc::try_from_vec(data).map_err(|e| SaveImageFileError::FontError(e.to_string()))?;
      draw = draw.with_font(font);
    } else {
      debug!("未指定字体，只绘制检测框");
    }

    Ok(SaveImageFileOutput {
      path: uri.path().to_string(),
      surface,
      draw,
    })
  }
}

impl SaveImageFileOutput {
  fn save_image(&self, image: image::RgbaImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    debug!("保存叠加层到文件: {}", self.path);

    Ok(())
  }
}

impl Render<DetectResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn surface_size(&self) -> SurfaceSize {
    self.surface
  }

  fn render_result(&self, result: &DetectResult) -> Result<(), Self::Error> {
    let image = self.draw.draw_overlay(self.surface, result);
    self.save_image(image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{geometry::BBox, model::FinalBox};

  #[test]
  fn saves_overlay_with_surface_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/overlay.png");
    let url = Url::parse(&format!("image://{}?width=64&height=48", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.surface_size(), SurfaceSize::new(64, 48));

    let result = DetectResult::new(
      3,
      (64, 48),
      vec![FinalBox::new(1, "door".into(), 0.72, BBox::from_corners(4.0, 4.0, 30.0, 20.0))],
    );
    output.render_result(&result).unwrap();

    let saved = image::open(&path).unwrap().to_rgba8();
    assert_eq!(saved.dimensions(), (64, 48));
    assert_eq!(saved.get_pixel(4, 10)[2], 255);
  }

  #[test]
  fn missing_font_file_is_an_error() {
    let url = Url::parse("image:///tmp/overlay.png?font=/nonexistent/font.ttf").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::IoError(_))
    ));
  }
}
