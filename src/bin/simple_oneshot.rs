// 该文件是 Menpai （门牌） 项目的一部分。
// src/bin/simple_oneshot.rs - 单帧检测与叠加层输出
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use menpai::{
  FromUrl,
  args::DetectArgs,
  pipeline::{DetectionPipeline, LogNotifier},
  task::{OneShotTask, Task},
};
use tracing::info;

/// Menpai 单帧检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub detect: DetectArgs,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，width/height 查询参数指定显示表面尺寸
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = menpai::input::InputWrapper::from_url(&args.input)?;
  let output = menpai::output::OutputWrapper::from_url(&args.output)?;
  let pipeline = DetectionPipeline::from_setup(args.detect.build_pipeline(), &LogNotifier);

  let stats = OneShotTask.run_task(input, pipeline, output)?;
  info!("处理 {} 帧, 失败 {} 帧", stats.processed, stats.failed);

  Ok(())
}
