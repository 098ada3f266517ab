// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bot/telegram.rs - Telegram 通道
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
use std::sync::Arc;

use async_trait::async_trait;
use teloxide::{
  net::Download,
  prelude::*,
  types::{ChatId, InputFile, MessageId, PhotoSize, ReplyParameters},
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::{
  bot::{ChatHandler, ChatTransport, Inbound, InboundKind, TransportError},
  model::DetectorProvider,
};

pub struct TelegramTransport {
  bot: Bot,
  username: String,
}

impl TelegramTransport {
  pub fn new(bot: Bot, username: impl Into<String>) -> Self {
    Self {
      bot,
      username: username.into(),
    }
  }

  /// 查询机器人自身的用户名，用于解析 `/cmd@name` 形式的命令
  pub async fn connect(bot: Bot) -> Result<Self, TransportError> {
    let me = bot.get_me().await?;
    info!("已连接到 Telegram: @{}", me.username());
    Ok(Self::new(bot, me.username()))
  }

  pub fn bot(&self) -> &Bot {
    &self.bot
  }

  pub fn username(&self) -> &str {
    &self.username
  }

  pub fn inbound(&self, msg: &Message) -> Inbound {
    if let Some(largest) = msg.photo().and_then(largest_photo) {
      return Inbound {
        chat: msg.chat.id,
        message: msg.id,
        kind: InboundKind::Photo {
          file_id: largest.file.id.clone(),
        },
      };
    }

    match msg.text() {
      Some(text) => Inbound::from_text(msg.chat.id, msg.id, text, &self.username),
      None => Inbound {
        chat: msg.chat.id,
        message: msg.id,
        kind: InboundKind::Other,
      },
    }
  }
}

/// 同一张照片的多个尺寸中像素最多的一个
fn largest_photo(sizes: &[PhotoSize]) -> Option<&PhotoSize> {
  sizes
    .iter()
    .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
  async fn reply(&self, chat: ChatId, to: MessageId, text: &str) -> Result<MessageId, TransportError> {
    let sent = self
      .bot
      .send_message(chat, text)
      .reply_parameters(ReplyParameters::new(to))
      .await?;
    Ok(sent.id)
  }

  async fn send_text(&self, chat: ChatId, text: &str) -> Result<MessageId, TransportError> {
    let sent = self.bot.send_message(chat, text).await?;
    Ok(sent.id)
  }

  async fn send_photo(&self, chat: ChatId, photo: &Path, caption: &str) -> Result<(), TransportError> {
    self
      .bot
      .send_photo(chat, InputFile::file(photo.to_path_buf()))
      .caption(caption)
      .await?;
    Ok(())
  }

  async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> Result<(), TransportError> {
    self.bot.edit_message_text(chat, message, text).await?;
    Ok(())
  }

  async fn delete(&self, chat: ChatId, message: MessageId) -> Result<(), TransportError> {
    self.bot.delete_message(chat, message).await?;
    Ok(())
  }

  async fn download_file(&self, file_id: &str, dest: &Path) -> Result<(), TransportError> {
    let file = self.bot.get_file(file_id).await?;
    debug!("下载文件: {}", file.path);

    let mut dst = tokio::fs::File::create(dest).await?;
    self.bot.download_file(&file.path, &mut dst).await?;
    dst.flush().await?;
    Ok(())
  }
}

/// 长轮询接收消息，所有更新排成一个队列依次处理
pub async fn run_polling<P>(handler: Arc<ChatHandler<P, TelegramTransport>>)
where
  P: DetectorProvider + 'static,
{
  let bot = handler.transport().bot().clone();
  info!("开始接收消息: @{}", handler.transport().username());

  let schema = Update::filter_message().endpoint(on_message::<P>);
  Dispatcher::builder(bot, schema)
    .dependencies(dptree::deps![handler])
    .distribution_function(|_| Some(()))
    .default_handler(|update| async move {
      debug!("忽略更新: {:?}", update.id);
    })
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

  info!("停止接收消息");
}

async fn on_message<P>(
  msg: Message,
  handler: Arc<ChatHandler<P, TelegramTransport>>,
) -> ResponseResult<()>
where
  P: DetectorProvider + 'static,
{
  let inbound = handler.transport().inbound(&msg);
  handler.handle(inbound).await;
  Ok(())
}

#[cfg(test)]
mod tests {
  use teloxide::types::FileMeta;

  use super::*;

  fn size(id: &str, width: u32, height: u32) -> PhotoSize {
    PhotoSize {
      file: FileMeta {
        id: id.to_string(),
        unique_id: format!("u-{id}"),
        size: width * height,
      },
      width,
      height,
    }
  }

  #[test]
  fn largest_photo_size_is_chosen() {
    let sizes = [size("small", 90, 60), size("large", 1280, 960), size("medium", 320, 240)];
    let largest = largest_photo(&sizes).unwrap();
    assert_eq!(largest.file.id, "large");
    assert!(largest_photo(&[]).is_none());
  }
}
