// 该文件是 Menpai （门牌） 项目的一部分。
// src/label.rs - 类别标签表
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

use std::{path::Path, sync::Arc};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("无法读取标签文件 {path}: {source}")]
  Io {
    path: String,
    source: std::io::Error,
  },
  #[error("标签文件为空")]
  Empty,
  #[error("标签文件第 {0} 行为空")]
  BlankLine(usize),
  #[error("标签数量与模型类别数不符: 期望 {expected}, 实际 {actual}")]
  CountMismatch { expected: usize, actual: usize },
}

/// 按类别索引排列的标签名，启动时加载一次，之后只读共享
#[derive(Debug, Clone)]
pub struct LabelTable {
  names: Arc<[Arc<str>]>,
}

impl LabelTable {
  /// 从按行分隔的文本文件加载
  pub fn load(path: impl AsRef<Path>) -> Result<Self, LabelError> {
    let path = path.as_ref();
    info!("加载标签文件: {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|source| LabelError::Io {
      path: path.display().to_string(),
      source,
    })?;
    let table = Self::parse(&text)?;
    debug!("共加载 {} 个标签", table.len());
    Ok(table)
  }

  /// 每行一个标签；忽略行尾的 `\r` 与文件末尾的空行
  pub fn parse(text: &str) -> Result<Self, LabelError> {
    let mut lines: Vec<&str> = text
      .split('\n')
      .map(|line| line.trim_end_matches('\r'))
      .collect();

    while lines.last().is_some_and(|line| line.trim().is_empty()) {
      lines.pop();
    }

    if lines.is_empty() {
      return Err(LabelError::Empty);
    }

    if let Some(idx) = lines.iter().position(|line| line.trim().is_empty()) {
      return Err(LabelError::BlankLine(idx + 1));
    }

    Ok(Self::from_names(lines))
  }

  pub fn from_names<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let names: Vec<Arc<str>> = names
      .into_iter()
      .map(|name| Arc::from(name.as_ref()))
      .collect();
    Self {
      names: names.into(),
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  pub fn get(&self, class_id: usize) -> Option<&Arc<str>> {
    self.names.get(class_id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &Arc<str>> {
    self.names.iter()
  }

  /// 校验标签数量与模型类别数一致
  pub fn ensure_len(&self, expected: usize) -> Result<(), LabelError> {
    if self.len() != expected {
      return Err(LabelError::CountMismatch {
        expected,
        actual: self.len(),
      });
    }
    Ok(())
  }
}
