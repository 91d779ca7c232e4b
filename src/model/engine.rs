// 该文件是 Menpai （门牌） 项目的一部分。
// src/model/engine.rs - 推理引擎选择
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

use crate::{
  FromUrl,
  frame::RgbNhwcFrame,
  model::{LayoutError, Model, ReplayEngine, TensorLayout},
};

const REPLAY_SCHEME: &str = "replay";
#[cfg(feature = "backend-rknpu")]
const RKNN_SCHEME: &str = "rknn";

#[derive(Error, Debug)]
pub enum EngineError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("张量文件长度 {0} 不是 4 字节的整数倍")]
  TruncatedTensor(usize),
  #[error("模型布局错误: {0}")]
  Layout(#[from] LayoutError),
  #[error("不支持的模型方案: {0}")]
  SchemeMismatch(String),
  #[cfg(feature = "backend-rknpu")]
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[cfg(feature = "backend-rknpu")]
  #[error("RKNN 错误: {0}")]
  RknnError(rknpu::Error),
}

#[cfg(feature = "backend-rknpu")]
impl From<rknpu::Error> for EngineError {
  fn from(err: rknpu::Error) -> Self {
    EngineError::RknnError(err)
  }
}

#[cfg(feature = "backend-rknpu")]
impl EngineError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    EngineError::ModelInvalid(msg.to_string(), e)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineKind {
  Replay,
  #[cfg(feature = "backend-rknpu")]
  Rknn,
}

/// 按 URL 方案选择引擎，模型约定（布局）写在查询参数中
#[derive(Debug, Clone)]
pub struct EngineBuilder {
  kind: EngineKind,
  path: String,
  layout: TensorLayout,
}

impl FromUrl for EngineBuilder {
  type Error = EngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let kind = match url.scheme() {
      REPLAY_SCHEME => EngineKind::Replay,
      #[cfg(feature = "backend-rknpu")]
      RKNN_SCHEME => EngineKind::Rknn,
      other => return Err(EngineError::SchemeMismatch(other.to_string())),
    };

    Ok(Self {
      kind,
      path: url.path().to_string(),
      layout: TensorLayout::from_query(url)?,
    })
  }
}

impl EngineBuilder {
  pub fn layout(&self) -> TensorLayout {
    self.layout
  }

  pub fn build(self) -> Result<(EngineWrapper, TensorLayout), EngineError> {
    let engine = match self.kind {
      EngineKind::Replay => EngineWrapper::Replay(ReplayEngine::open(&self.path)?),
      #[cfg(feature = "backend-rknpu")]
      EngineKind::Rknn => {
        EngineWrapper::Rknn(super::RknnEngine::load(&self.path, rknpu::InitFlags::default())?)
      }
    };
    Ok((engine, self.layout))
  }
}

pub enum EngineWrapper {
  Replay(ReplayEngine),
  #[cfg(feature = "backend-rknpu")]
  Rknn(super::RknnEngine),
}

impl Model for EngineWrapper {
  type Input = RgbNhwcFrame;
  type Output = Vec<f32>;
  type Error = EngineError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    match self {
      EngineWrapper::Replay(engine) => engine.infer(input),
      #[cfg(feature = "backend-rknpu")]
      EngineWrapper::Rknn(engine) => engine.infer(input),
    }
  }

  fn output_len(&self) -> Option<usize> {
    match self {
      EngineWrapper::Replay(engine) => engine.output_len(),
      #[cfg(feature = "backend-rknpu")]
      EngineWrapper::Rknn(engine) => engine.output_len(),
    }
  }
}
