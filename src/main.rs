// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 目标检测聊天机器人
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

mod args;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use teloxide::Bot;
use tracing::info;

use shanan_bot::{
  FromUrl,
  bot::{ChatHandler, HandlerConfig, TelegramTransport, run_polling},
  model::{ModelProvisioner, ProvisionedDetector, YoloBuilder},
  output::SaveImageFileOutput,
};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型文件: {}", args.model);
  info!("模型下载地址: {}", args.model_url);
  info!("置信度阈值: {}%", args.confidence);
  info!("NMS 阈值: {}", args.nms_threshold);
  info!("临时目录: {}", args.work_dir.display());

  // 模型 URL 只决定本地路径，检测器在模型就绪后按该路径构建
  let builder = YoloBuilder::from_url(&args.model)?;
  let provisioner = ModelProvisioner::new(args.model_url.clone(), builder.model_path());
  let nms_threshold = args.nms_threshold;
  if !provisioner.is_present() {
    info!("模型尚未下载，将在收到第一张照片时下载");
  }
  let provider = ProvisionedDetector::new(provisioner, move |path| {
    YoloBuilder::new(path)
      .nms_threshold(nms_threshold)
      .build()
  });

  let transport = TelegramTransport::connect(Bot::new(args.token)).await?;
  let config = HandlerConfig {
    work_dir: args.work_dir,
    min_confidence: args.confidence,
    max_message_len: args.max_message_len,
  };
  let handler = ChatHandler::new(provider, transport, SaveImageFileOutput::default(), config);

  info!("机器人已启动，等待照片...");
  run_polling(Arc::new(handler)).await;

  Ok(())
}
