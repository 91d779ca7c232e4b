// 该文件是 Menpai （门牌） 项目的一部分。
// src/args.rs - 命令行参数配置
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

use std::path::PathBuf;

use clap::Args;
use tracing::info;
use url::Url;

use crate::{
  FromUrl,
  config::PipelineConfig,
  label::LabelTable,
  model::{EngineBuilder, EngineWrapper, SuppressionPolicy},
  pipeline::{DetectionPipeline, SetupError},
  transform::FitPolicy,
};

/// 检测流水线参数，由各个可执行文件展开使用
#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
  /// 模型地址，布局写在查询参数中
  /// 例如: replay:///data/tensor.bin?anchors=8400&classes=3&units=pixels&width=640&height=640
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 标签文件，每行一个类别名
  #[arg(long, value_name = "FILE")]
  pub labels: PathBuf,

  /// objectness 下限 (0.0 - 1.0)
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD")]
  pub objectness: f32,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 映射到显示表面的方式: letterbox 或 fill
  #[arg(long, default_value = "letterbox", value_name = "FIT")]
  pub fit: FitPolicy,

  /// 抑制策略: global 或 per-class
  #[arg(long, default_value = "global", value_name = "POLICY")]
  pub suppression: SuppressionPolicy,
}

impl DetectArgs {
  pub fn config(&self) -> PipelineConfig {
    PipelineConfig::default()
      .with_floors(self.objectness, self.confidence)
      .with_iou_threshold(self.nms_threshold)
      .with_suppression(self.suppression)
      .with_fit(self.fit)
  }

  /// 加载引擎与标签表并校验形状
  pub fn build_pipeline(&self) -> Result<DetectionPipeline<EngineWrapper>, SetupError> {
    info!("模型地址: {}", self.model);
    let builder = EngineBuilder::from_url(&self.model)?;
    let labels = LabelTable::load(&self.labels)?;
    let (engine, layout) = builder.build()?;
    DetectionPipeline::new(engine, layout, labels, self.config())
  }
}
