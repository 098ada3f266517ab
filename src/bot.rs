// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bot.rs - 对话通道定义
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

use std::path::Path;

use async_trait::async_trait;
use teloxide::{
  types::{ChatId, MessageId},
  utils::command::BotCommands,
};
use thiserror::Error;

mod handler;
mod telegram;
mod temp;

pub use self::handler::{ChatHandler, HandleError, HandlerConfig, RequestState};
pub use self::telegram::{TelegramTransport, run_polling};
pub use self::temp::TempFiles;

pub const WELCOME_TEXT: &str = "🚀 Object Detection Bot\n\n\
I analyse your photos and find the objects on them.\n\n\
How to use:\n\
1. Send me a photo\n\
2. I find every object on it\n\
3. You get the image with the objects outlined\n\
4. And a detailed report of what was found\n\n\
Commands:\n\
/start - show this message\n\
/help - help\n\
/status - bot status\n\n\
Send me a photo to analyse! 📸";

pub const PROMPT_TEXT: &str = "📸 Send me a photo to analyse the objects on it!";
pub const PROCESSING_TEXT: &str = "🔄 Processing the image... Please wait.";
pub const NOTHING_FOUND_TEXT: &str = crate::report::EMPTY_REPORT;
pub const ERROR_TEXT: &str = "❌ An error occurred while processing the image. Please try again later.";

/// `/status` 的回复，附带模型是否已经加载
pub fn status_text(model_loaded: bool) -> String {
  let model = if model_loaded {
    "The object detection model is loaded."
  } else {
    "The object detection model will be loaded with the first photo."
  };
  format!("✅ The bot is up and ready to work!\n{}", model)
}

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
  #[command(description = "show the welcome message.")]
  Start,
  #[command(description = "show usage help.")]
  Help,
  #[command(description = "show bot status.")]
  Status,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
  Command(Command),
  /// 最大尺寸照片的文件 id
  Photo { file_id: String },
  /// 普通文本或无法识别的命令
  Text,
  Other,
}

/// 与通道无关的入站消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
  pub chat: ChatId,
  pub message: MessageId,
  pub kind: InboundKind,
}

impl Inbound {
  /// 把文本消息解析成命令或普通文本
  pub fn from_text(chat: ChatId, message: MessageId, text: &str, bot_name: &str) -> Self {
    let kind = match Command::parse(text, bot_name) {
      Ok(command) => InboundKind::Command(command),
      Err(_) => InboundKind::Text,
    };
    Self {
      chat,
      message,
      kind,
    }
  }
}

#[derive(Error, Debug)]
pub enum TransportError {
  #[error("请求失败: {0}")]
  Request(#[from] teloxide::RequestError),
  #[error("下载失败: {0}")]
  Download(#[from] teloxide::DownloadError),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("请求被拒绝: {0}")]
  Rejected(String),
}

/// 外部对话通道
#[async_trait]
pub trait ChatTransport: Send + Sync {
  /// 回复某条消息，返回新消息的 id
  async fn reply(&self, chat: ChatId, to: MessageId, text: &str) -> Result<MessageId, TransportError>;

  async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId, TransportError>;

  async fn send_photo(&self, chat: ChatId, photo: &Path, caption: &str) -> Result<(), TransportError>;

  async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<(), TransportError>;

  async fn delete(&self, chat: ChatId, message: MessageId) -> Result<(), TransportError>;

  /// 把文件下载到 `dest`
  async fn download_file(&self, file_id: &str, dest: &Path) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn commands_are_parsed() {
    let inbound = Inbound::from_text(ChatId(1), MessageId(2), "/start", "shanan_bot");
    assert_eq!(inbound.kind, InboundKind::Command(Command::Start));

    let inbound = Inbound::from_text(ChatId(1), MessageId(2), "/status@shanan_bot", "shanan_bot");
    assert_eq!(inbound.kind, InboundKind::Command(Command::Status));
  }

  #[test]
  fn unknown_commands_and_text_are_plain_text() {
    let inbound = Inbound::from_text(ChatId(1), MessageId(2), "/unknown", "shanan_bot");
    assert_eq!(inbound.kind, InboundKind::Text);

    let inbound = Inbound::from_text(ChatId(1), MessageId(2), "hello there", "shanan_bot");
    assert_eq!(inbound.kind, InboundKind::Text);
  }

  #[test]
  fn status_mentions_model_state() {
    assert!(status_text(true).contains("is loaded"));
    assert!(status_text(false).contains("first photo"));
  }
}
