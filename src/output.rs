// 该文件是 Menpai （门牌） 项目的一部分。
// src/output.rs - 输出定义
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
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, model::DetectResult, query_param, transform::SurfaceSize};

/// 渲染器只接收已经位于表面像素坐标中的结果，不做任何几何变换
pub trait Render<Output> {
  type Error;
  fn surface_size(&self) -> SurfaceSize;
  fn render_result(&self, result: &Output) -> Result<(), Self::Error>;
}

mod overlay;
pub use self::overlay::{Overlay, RenderLoop};

mod log_output;
pub use self::log_output::{LogOutput, LogOutputError};

#[cfg(feature = "save_image_file")]
pub mod draw;

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "json_record")]
mod json_record;
#[cfg(feature = "json_record")]
pub use self::json_record::{JsonRecordError, JsonRecordOutput};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("日志输出错误: {0}")]
  LogOutputError(#[from] LogOutputError),
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "json_record")]
  #[error("JSON 记录错误: {0}")]
  JsonRecordError(#[from] JsonRecordError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 读取 `width`/`height` 查询参数，缺省时使用默认表面尺寸
pub(crate) fn surface_from_query(url: &Url) -> Result<SurfaceSize, (&'static str, String)> {
  let default = SurfaceSize::default();
  let width = match query_param::<u32>(url, "width") {
    Some(Ok(v)) => v,
    Some(Err(v)) => return Err(("width", v)),
    None => default.width,
  };
  let height = match query_param::<u32>(url, "height") {
    Some(Ok(v)) => v,
    Some(Err(v)) => return Err(("height", v)),
    None => default.height,
  };
  Ok(SurfaceSize::new(width, height))
}

pub enum OutputWrapper {
  LogOutput(LogOutput),
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
  #[cfg(feature = "json_record")]
  JsonRecordOutput(JsonRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      LogOutput::SCHEME => {
        let output = LogOutput::from_url(url)?;
        Ok(OutputWrapper::LogOutput(output))
      }
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      #[cfg(feature = "json_record")]
      JsonRecordOutput::SCHEME => {
        let output = JsonRecordOutput::from_url(url)?;
        Ok(OutputWrapper::JsonRecordOutput(output))
      }
      other => Err(OutputError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Render<DetectResult> for OutputWrapper {
  type Error = OutputError;

  fn surface_size(&self) -> SurfaceSize {
    match self {
      OutputWrapper::LogOutput(output) => output.surface_size(),
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => output.surface_size(),
      #[cfg(feature = "json_record")]
      OutputWrapper::JsonRecordOutput(output) => output.surface_size(),
    }
  }

  fn render_result(&self, result: &DetectResult) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::LogOutput(output) => output.render_result(result).map_err(OutputError::from),
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(result)
        .map_err(OutputError::from),
      #[cfg(feature = "json_record")]
      OutputWrapper::JsonRecordOutput(output) => output
        .render_result(result)
        .map_err(OutputError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn selects_output_by_scheme() {
    let url = Url::parse("log://?width=640&height=480").unwrap();
    let output = OutputWrapper::from_url(&url).unwrap();
    assert!(matches!(output, OutputWrapper::LogOutput(_)));
    assert_eq!(output.surface_size(), SurfaceSize::new(640, 480));

    let url = Url::parse("rtsp://localhost/live").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Err(OutputError::SchemeMismatch(s)) if s == "rtsp"
    ));
  }

  #[test]
  fn surface_query_defaults_and_errors() {
    let url = Url::parse("log://").unwrap();
    assert_eq!(surface_from_query(&url).unwrap(), SurfaceSize::default());

    let url = Url::parse("log://?width=wide").unwrap();
    assert_eq!(surface_from_query(&url), Err(("width", "wide".to_string())));
  }
}
