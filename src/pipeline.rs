// 该文件是 Menpai （门牌） 项目的一部分。
// src/pipeline.rs - 单帧处理流水线
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

//! 预处理 → 推理 → 解码 → 抑制 → 坐标映射。
//!
//! 启动阶段的错误使流水线整体不可用，之后每帧都走快速路径；
//! 单帧错误只记录日志并丢弃该帧。无论哪条路径，帧都恰好释放一次。

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::{
  config::{ConfigError, PipelineConfig},
  frame::{FrameGuard, RgbNhwcFrame, SensorFrame},
  input::Preprocessor,
  label::{LabelError, LabelTable},
  model::{DecodeError, Decoder, DetectResult, EngineError, LayoutError, Model, TensorLayout, suppress_with},
  transform::{SurfaceSize, TransformContext, TransformError, map_to_surface},
};

#[derive(Error, Debug)]
pub enum SetupError {
  #[error("推理引擎错误: {0}")]
  Engine(#[from] EngineError),
  #[error("预热推理失败: {0}")]
  WarmUp(String),
  #[error("标签错误: {0}")]
  Labels(#[from] LabelError),
  #[error("张量布局错误: {0}")]
  Layout(#[from] LayoutError),
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("推理失败: {0}")]
  Engine(String),
  #[error("解码失败: {0}")]
  Decode(#[from] DecodeError),
  #[error("坐标映射失败: {0}")]
  Transform(#[from] TransformError),
}

/// 面向用户的非阻塞通知
pub trait Notifier {
  fn notify(&self, message: &str);
}

/// 写入日志并打印到标准错误
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  fn notify(&self, message: &str) {
    error!("{}", message);
    eprintln!("{}", message);
  }
}

#[derive(Debug)]
pub enum FrameOutcome {
  Detected(DetectResult),
  EngineUnavailable,
  Dropped(FrameError),
}

enum EngineState<M> {
  Ready { model: M, decoder: Decoder },
  Unavailable { reason: String },
}

pub struct DetectionPipeline<M> {
  state: EngineState<M>,
  preprocessor: Preprocessor,
  config: PipelineConfig,
}

impl<M> DetectionPipeline<M>
where
  M: Model<Input = RgbNhwcFrame, Output = Vec<f32>>,
  M::Error: std::fmt::Display,
{
  /// 校验配置、标签与引擎输出形状，任何不一致都在这里报告
  pub fn new(
    model: M,
    layout: TensorLayout,
    labels: LabelTable,
    config: PipelineConfig,
  ) -> Result<Self, SetupError> {
    config.validate()?;
    let len = match model.output_len() {
      Some(len) => len,
      None => Self::warm_up(&model, &layout)?,
    };
    layout.validate_len(len)?;
    let decoder = Decoder::new(layout, labels, config.objectness_floor, config.combined_floor)?;
    debug!(
      "流水线就绪: {} 个锚点, {} 个类别, 输入 {}x{}",
      layout.num_anchors(),
      layout.num_classes(),
      layout.input_width(),
      layout.input_height()
    );

    Ok(Self {
      state: EngineState::Ready { model, decoder },
      preprocessor: Preprocessor::new(layout.input_width(), layout.input_height()),
      config,
    })
  }

  /// 引擎未声明输出长度时，用全零输入推理一次得到实际长度
  fn warm_up(model: &M, layout: &TensorLayout) -> Result<usize, SetupError> {
    debug!("引擎未声明输出长度，执行一次预热推理");
    let input = RgbNhwcFrame::with_shape(layout.input_height() as usize, layout.input_width() as usize);
    let tensor = model
      .infer(&input)
      .map_err(|e| SetupError::WarmUp(e.to_string()))?;
    Ok(tensor.len())
  }

  /// 启动失败时返回一个不可用的流水线，并通知用户一次
  pub fn from_setup(setup: Result<Self, SetupError>, notifier: &dyn Notifier) -> Self {
    match setup {
      Ok(pipeline) => pipeline,
      Err(e) => {
        notifier.notify(&format!("检测功能不可用: {e}"));
        Self::unavailable(e.to_string())
      }
    }
  }

  pub fn unavailable(reason: impl Into<String>) -> Self {
    Self {
      state: EngineState::Unavailable {
        reason: reason.into(),
      },
      preprocessor: Preprocessor::new(1, 1),
      config: PipelineConfig::default(),
    }
  }

  pub fn is_available(&self) -> bool {
    matches!(self.state, EngineState::Ready { .. })
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  /// 处理一帧，返回前释放帧
  pub fn process<F: SensorFrame>(&self, frame: FrameGuard<F>, surface: SurfaceSize) -> FrameOutcome {
    let outcome = match &self.state {
      EngineState::Unavailable { reason } => {
        debug!("引擎不可用 ({}), 跳过第 {} 帧", reason, frame.index());
        FrameOutcome::EngineUnavailable
      }
      EngineState::Ready { model, decoder } => match self.detect(model, decoder, &*frame, surface) {
        Ok(result) => FrameOutcome::Detected(result),
        Err(e) => {
          warn!("丢弃第 {} 帧: {}", frame.index(), e);
          FrameOutcome::Dropped(e)
        }
      },
    };

    frame.release();
    outcome
  }

  fn detect<F: SensorFrame>(
    &self,
    model: &M,
    decoder: &Decoder,
    frame: &F,
    surface: SurfaceSize,
  ) -> Result<DetectResult, FrameError> {
    let input = self.preprocessor.prepare(frame.image());
    let tensor = model
      .infer(&input)
      .map_err(|e| FrameError::Engine(e.to_string()))?;

    let candidates = decoder.decode(&tensor)?;
    let kept = suppress_with(candidates, self.config.iou_threshold, self.config.suppression);

    // 预处理把传感器帧拉伸到模型输入，这里换算回传感器像素
    let layout = decoder.layout();
    let sx = frame.width() as f32 / layout.input_width() as f32;
    let sy = frame.height() as f32 / layout.input_height() as f32;
    let kept = kept.into_iter().map(|c| c.scaled(sx, sy)).collect();

    let ctx = TransformContext::new(
      (frame.width(), frame.height()),
      frame.rotation_degrees(),
      surface,
    );
    let boxes = map_to_surface(kept, &ctx, self.config.fit)?;
    debug!("第 {} 帧: {} 个检测框", frame.index(), boxes.len());

    Ok(DetectResult::new(
      frame.index(),
      (surface.width, surface.height),
      boxes,
    ))
  }
}
