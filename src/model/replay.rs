// 该文件是 Menpai （门牌） 项目的一部分。
// src/model/replay.rs - 回放录制好的输出张量
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

use tracing::{debug, info};

use crate::{
  frame::RgbNhwcFrame,
  model::{EngineError, Model},
};

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// 不依赖硬件的引擎：每次推理都返回同一份录制的小端 f32 张量
#[derive(Debug, Clone)]
pub struct ReplayEngine {
  tensor: Arc<[f32]>,
}

impl ReplayEngine {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
    let path = path.as_ref();
    info!("加载回放张量: {}", path.display());
    let bytes = std::fs::read(path)?;
    if bytes.len() % F32_BYTES != 0 {
      return Err(EngineError::TruncatedTensor(bytes.len()));
    }

    let tensor: Vec<f32> = bytes
      .chunks_exact(F32_BYTES)
      .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
      .collect();
    debug!("回放张量元素个数: {}", tensor.len());
    Ok(Self::from_values(tensor))
  }

  pub fn from_values(tensor: Vec<f32>) -> Self {
    Self {
      tensor: tensor.into(),
    }
  }
}

impl Model for ReplayEngine {
  type Input = RgbNhwcFrame;
  type Output = Vec<f32>;
  type Error = EngineError;

  fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(self.tensor.to_vec())
  }

  fn output_len(&self) -> Option<usize> {
    Some(self.tensor.len())
  }
}
