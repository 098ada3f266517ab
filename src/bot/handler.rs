// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bot/handler.rs - 消息处理流程
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

use std::fmt;
use std::path::PathBuf;

use teloxide::types::{ChatId, MessageId};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  bot::{
    ChatTransport, Command, ERROR_TEXT, Inbound, InboundKind, NOTHING_FOUND_TEXT, PROCESSING_TEXT,
    PROMPT_TEXT, TempFiles, TransportError, WELCOME_TEXT, status_text,
  },
  model::{DetectError, DetectorProvider},
  output::SaveImageFileOutput,
  report::split_message,
  task::{OneShotTask, TaskError},
};

#[derive(Error, Debug)]
pub enum HandleError {
  #[error("通道错误: {0}")]
  Transport(#[from] TransportError),
  #[error("检测器不可用: {0}")]
  Detector(#[from] DetectError),
  #[error("任务失败: {0}")]
  Task(#[from] TaskError),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
}

/// 单张照片请求所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
  Idle,
  Received,
  Downloading,
  Detecting,
  Rendering,
  Reporting,
  Replied,
  Failed,
}

impl fmt::Display for RequestState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      RequestState::Idle => "idle",
      RequestState::Received => "received",
      RequestState::Downloading => "downloading",
      RequestState::Detecting => "detecting",
      RequestState::Rendering => "rendering",
      RequestState::Reporting => "reporting",
      RequestState::Replied => "replied",
      RequestState::Failed => "failed",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone)]
pub struct HandlerConfig {
  /// 临时文件所在目录
  pub work_dir: PathBuf,
  /// 最低置信度，百分比
  pub min_confidence: f32,
  /// 单条文本消息的最大字符数
  pub max_message_len: usize,
}

impl Default for HandlerConfig {
  fn default() -> Self {
    Self {
      work_dir: PathBuf::from("."),
      min_confidence: 40.0,
      max_message_len: 4096,
    }
  }
}

struct PhotoRequest {
  chat: ChatId,
  message: MessageId,
  state: RequestState,
  /// “处理中”提示消息
  notice: Option<MessageId>,
}

impl PhotoRequest {
  fn transition(&mut self, next: RequestState) {
    debug!("请求 chat {} 状态: {} -> {}", self.chat.0, self.state, next);
    self.state = next;
  }
}

pub struct ChatHandler<P, T> {
  provider: P,
  transport: T,
  renderer: SaveImageFileOutput,
  config: HandlerConfig,
}

impl<P: DetectorProvider, T: ChatTransport> ChatHandler<P, T> {
  pub fn new(provider: P, transport: T, renderer: SaveImageFileOutput, config: HandlerConfig) -> Self {
    Self {
      provider,
      transport,
      renderer,
      config,
    }
  }

  pub fn transport(&self) -> &T {
    &self.transport
  }

  /// 处理一条入站消息，错误在内部消化
  pub async fn handle(&self, inbound: Inbound) {
    match &inbound.kind {
      InboundKind::Command(Command::Start | Command::Help) => {
        self.reply_quietly(&inbound, WELCOME_TEXT).await;
      }
      InboundKind::Command(Command::Status) => {
        let text = status_text(self.provider.is_loaded());
        self.reply_quietly(&inbound, &text).await;
      }
      InboundKind::Photo { file_id } => {
        self.handle_photo(&inbound, file_id).await;
      }
      InboundKind::Text => self.reply_quietly(&inbound, PROMPT_TEXT).await,
      InboundKind::Other => debug!("忽略消息: chat {}", inbound.chat.0),
    }
  }

  /// 处理一张照片，返回请求的最终状态
  pub async fn handle_photo(&self, inbound: &Inbound, file_id: &str) -> RequestState {
    info!("收到照片: chat {}", inbound.chat.0);
    let mut request = PhotoRequest {
      chat: inbound.chat,
      message: inbound.message,
      state: RequestState::Idle,
      notice: None,
    };
    let mut temp = TempFiles::new();

    if let Err(e) = self.process_photo(&mut request, file_id, &mut temp).await {
      error!("处理照片失败: chat {}: {}", request.chat.0, e);
      request.transition(RequestState::Failed);
      self.report_failure(&request).await;
    }

    drop(temp);
    request.state
  }

  async fn process_photo(
    &self,
    request: &mut PhotoRequest,
    file_id: &str,
    temp: &mut TempFiles,
  ) -> Result<(), HandleError> {
    let chat = request.chat;

    request.transition(RequestState::Received);
    let notice = self
      .transport
      .reply(chat, request.message, PROCESSING_TEXT)
      .await?;
    request.notice = Some(notice);

    request.transition(RequestState::Downloading);
    tokio::fs::create_dir_all(&self.config.work_dir).await?;
    let input = temp.track(self.config.work_dir.join(format!("temp_input_{}.jpg", chat.0)));
    let output = temp.track(self.config.work_dir.join(format!("result_{}.jpg", chat.0)));
    self.transport.download_file(file_id, &input).await?;

    request.transition(RequestState::Detecting);
    let detector = self.provider.detector().await?;
    let task = OneShotTask::new(input, output, self.config.min_confidence);
    let Some(analysis) = task.detect(detector)? else {
      info!("未检测到目标: chat {}", chat.0);
      self
        .transport
        .edit_text(chat, notice, NOTHING_FOUND_TEXT)
        .await?;
      request.transition(RequestState::Replied);
      return Ok(());
    };

    request.transition(RequestState::Rendering);
    let annotated = task.render(&self.renderer, analysis)?;

    request.transition(RequestState::Reporting);
    self
      .transport
      .send_photo(chat, &annotated.image, &annotated.caption)
      .await?;
    let segments = split_message(&annotated.report, self.config.max_message_len);
    debug!("报告分为 {} 段", segments.len());
    for segment in &segments {
      self.transport.send_text(chat, segment).await?;
    }

    // 结果已经送达，提示消息删不掉不算失败
    if let Err(e) = self.transport.delete(chat, notice).await {
      warn!("无法删除提示消息: {}", e);
    }

    request.transition(RequestState::Replied);
    info!(
      "照片处理完成: chat {}, {} 个目标",
      chat.0,
      annotated.analysis.len()
    );
    Ok(())
  }

  /// 先尝试改写提示消息，不行再单独回复
  async fn report_failure(&self, request: &PhotoRequest) {
    if let Some(notice) = request.notice {
      match self.transport.edit_text(request.chat, notice, ERROR_TEXT).await {
        Ok(()) => return,
        Err(e) => warn!("无法改写提示消息: {}", e),
      }
    }

    if let Err(e) = self
      .transport
      .reply(request.chat, request.message, ERROR_TEXT)
      .await
    {
      error!("无法发送错误提示: {}", e);
    }
  }

  async fn reply_quietly(&self, inbound: &Inbound, text: &str) {
    if let Err(e) = self.transport.reply(inbound.chat, inbound.message, text).await {
      warn!("回复失败: chat {}: {}", inbound.chat.0, e);
    }
  }
}
