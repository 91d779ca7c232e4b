// 该文件是 Menpai （门牌） 项目的一部分。
// src/output/json_record.rs - 以 JSON Lines 记录检测结果
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

use std::{
  fs::{File, OpenOptions},
  io::Write,
  path::PathBuf,
  sync::Mutex,
};

use chrono::Utc;
use serde_json::{Value, json};
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
pub enum JsonRecordError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 编码错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("无效的查询参数 {0}: {1}")]
  InvalidParam(&'static str, String),
}

/// 每个快照追加一行；空结果同样记录，表示叠加层被清空
pub struct JsonRecordOutput {
  path: PathBuf,
  surface: SurfaceSize,
  file: Mutex<File>,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonRecordError::SchemeMismatch);
    }
    let surface =
      surface_from_query(uri).map_err(|(name, value)| JsonRecordError::InvalidParam(name, value))?;

    let path = PathBuf::from(uri.path());
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    info!("检测结果记录到: {}", path.display());

    Ok(Self {
      path,
      surface,
      file: Mutex::new(file),
    })
  }
}

impl JsonRecordOutput {
  pub fn path(&self) -> &PathBuf {
    &self.path
  }

  fn to_record(result: &DetectResult) -> Value {
    let boxes: Vec<Value> = result
      .items
      .iter()
      .map(|item| {
        json!({
          "class_id": item.class_id,
          "label": item.label.as_ref(),
          "confidence": item.confidence,
          "bbox": item.bbox.to_array(),
        })
      })
      .collect();

    json!({
      "timestamp": Utc::now().to_rfc3339(),
      "frame": result.frame_index,
      "surface": [result.surface.0, result.surface.1],
      "boxes": boxes,
    })
  }
}

impl Render<DetectResult> for JsonRecordOutput {
  type Error = JsonRecordError;

  fn surface_size(&self) -> SurfaceSize {
    self.surface
  }

  fn render_result(&self, result: &DetectResult) -> Result<(), Self::Error> {
    let mut line = serde_json::to_string(&Self::to_record(result))?;
    line.push('\n');
    let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    file.write_all(line.as_bytes())?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{geometry::BBox, model::FinalBox};

  #[test]
  fn appends_one_line_per_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("boxes.jsonl");
    let url = Url::parse(&format!("json://{}?width=1080&height=1920", path.display())).unwrap();
    let output = JsonRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.path(), &path);

    let item = FinalBox::new(1, "door".into(), 0.75, BBox::from_corners(10.0, 20.0, 30.0, 40.0));
    output
      .render_result(&DetectResult::new(4, (1080, 1920), vec![item]))
      .unwrap();
    output
      .render_result(&DetectResult::new(5, (1080, 1920), Vec::new()))
      .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> = text
      .lines()
      .map(|l| serde_json::from_str(l).unwrap())
      .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["frame"], 4);
    assert_eq!(lines[0]["boxes"][0]["label"], "door");
    assert_eq!(lines[0]["boxes"][0]["bbox"][2], 30.0);
    assert_eq!(lines[1]["boxes"].as_array().unwrap().len(), 0);
    assert!(lines[1]["timestamp"].is_string());
  }
}
