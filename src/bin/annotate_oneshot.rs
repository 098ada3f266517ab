// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/annotate_oneshot.rs - 离线标注单张图像
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use shanan_bot::{
  FromUrl,
  model::{ModelProvisioner, YoloBuilder},
  output::SaveImageFileOutput,
  task::{OneShotTask, Task, TaskOutcome},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 本地模型文件
  #[arg(long, default_value = "yolo://models/yolov8n.onnx", value_name = "MODEL")]
  pub model: Url,
  /// 本地缺少模型时的下载地址
  #[arg(
    long,
    default_value = "https://github.com/ultralytics/assets/releases/download/v8.2.0/yolov8n.onnx",
    value_name = "URL"
  )]
  pub model_url: Url,
  /// 输入图像
  #[arg(long, value_name = "SOURCE")]
  pub input: PathBuf,
  /// 标注图像输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: PathBuf,
  /// 置信度阈值 (0 - 100)
  #[arg(long, default_value = "40", value_name = "PERCENT")]
  pub confidence: f32,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型文件: {}", args.model);
  info!("输入图像: {}", args.input.display());
  info!("输出路径: {}", args.output.display());

  let builder = YoloBuilder::from_url(&args.model)?;
  ModelProvisioner::new(args.model_url, builder.model_path())
    .ensure()
    .await?;
  let detector = builder.build()?;
  let renderer = SaveImageFileOutput::default();

  let task = OneShotTask::new(args.input, args.output, args.confidence);
  match task.run_task(&detector, &renderer)? {
    TaskOutcome::NothingFound => println!("{}", shanan_bot::report::EMPTY_REPORT),
    TaskOutcome::Annotated(annotated) => {
      info!("标注图像已保存: {}", annotated.image.display());
      println!("{}\n\n{}", annotated.caption, annotated.report);
    }
  }

  Ok(())
}
