// 该文件是 Menpai （门牌） 项目的一部分。
// src/output/log_output.rs - 将检测框写入日志
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
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::DetectResult,
  output::{Render, surface_from_query},
  transform::SurfaceSize,
};

#[derive(Error, Debug)]
pub enum LogOutputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的查询参数 {0}: {1}")]
  InvalidParam(&'static str, String),
}

pub struct LogOutput {
  surface: SurfaceSize,
}

impl FromUrlWithScheme for LogOutput {
  const SCHEME: &'static str = "log";
}

impl FromUrl for LogOutput {
  type Error = LogOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(LogOutputError::SchemeMismatch(url.scheme().to_string()));
    }
    let surface =
      surface_from_query(url).map_err(|(name, value)| LogOutputError::InvalidParam(name, value))?;
    Ok(Self { surface })
  }
}

impl Render<DetectResult> for LogOutput {
  type Error = LogOutputError;

  fn surface_size(&self) -> SurfaceSize {
    self.surface
  }

  fn render_result(&self, result: &DetectResult) -> Result<(), Self::Error> {
    info!("第 {} 帧: {} 个目标", result.frame_index, result.len());
    for item in result.items.iter() {
      let [x1, y1, x2, y2] = item.bbox.to_array();
      info!(
        "  {} ({}) [{:.1}, {:.1}, {:.1}, {:.1}]",
        item.caption(),
        item.class_id,
        x1,
        y1,
        x2,
        y2
      );
    }
    Ok(())
  }
}
