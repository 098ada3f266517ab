// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 命令行参数
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

use clap::Parser;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// Telegram 机器人令牌
  #[arg(long, env = "TELOXIDE_TOKEN", hide_env_values = true, value_name = "TOKEN")]
  pub token: String,

  /// 本地模型文件，如 yolo://models/yolov8n.onnx
  #[arg(long, default_value = "yolo://models/yolov8n.onnx", value_name = "MODEL")]
  pub model: Url,

  /// 本地缺少模型时的下载地址
  #[arg(
    long,
    default_value = "https://github.com/ultralytics/assets/releases/download/v8.2.0/yolov8n.onnx",
    value_name = "URL"
  )]
  pub model_url: Url,

  /// 置信度阈值 (0 - 100)
  #[arg(long, default_value = "40", value_name = "PERCENT")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.45", value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 临时文件目录
  #[arg(long, default_value = ".", value_name = "DIR")]
  pub work_dir: PathBuf,

  /// 单条文本消息的最大字符数
  #[arg(long, default_value = "4096", value_name = "CHARS")]
  pub max_message_len: usize,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_applied() {
    let args = Args::try_parse_from(["shanan-bot", "--token", "123:abc"]).unwrap();
    assert_eq!(args.model.as_str(), "yolo://models/yolov8n.onnx");
    assert_eq!(args.confidence, 40.0);
    assert_eq!(args.nms_threshold, 0.45);
    assert_eq!(args.work_dir, PathBuf::from("."));
    assert_eq!(args.max_message_len, 4096);
  }

  #[test]
  fn default_model_url_maps_to_provisioned_path() {
    use shanan_bot::{FromUrl, model::{ModelProvisioner, YoloBuilder}};

    let args = Args::try_parse_from(["shanan-bot", "--token", "123:abc"]).unwrap();
    let builder = YoloBuilder::from_url(&args.model).unwrap();
    let provisioner = ModelProvisioner::new(args.model_url.clone(), builder.model_path());
    assert_eq!(provisioner.path(), std::path::Path::new("models/yolov8n.onnx"));
    assert_eq!(provisioner.url().path(), "/ultralytics/assets/releases/download/v8.2.0/yolov8n.onnx");
  }
}
