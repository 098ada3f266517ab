// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/provision.rs - 模型文件准备
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

use std::path::{Path, PathBuf};

use futures::StreamExt;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Error, Debug)]
pub enum ProvisionError {
  #[error("网络错误: {0}")]
  Network(#[from] reqwest::Error),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
}

/// 保证模型文件存在于本地，缺失时从网络下载
pub struct ModelProvisioner {
  url: Url,
  path: PathBuf,
  client: reqwest::Client,
}

impl ModelProvisioner {
  pub fn new(url: Url, path: impl Into<PathBuf>) -> Self {
    Self {
      url,
      path: path.into(),
      client: reqwest::Client::new(),
    }
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn is_present(&self) -> bool {
    self.path.exists()
  }

  /// 文件已存在时不访问网络
  pub async fn ensure(&self) -> Result<PathBuf, ProvisionError> {
    if self.is_present() {
      debug!("模型已存在: {}", self.path.display());
      return Ok(self.path.clone());
    }

    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent).await?;
    }

    info!("下载模型: {} -> {}", self.url, self.path.display());
    let partial = partial_path(&self.path);
    match self.download(&partial).await {
      Ok(size) => {
        tokio::fs::rename(&partial, &self.path).await?;
        info!(
          "模型下载完成: {:.2} MB",
          size as f64 / (1024.0 * 1024.0)
        );
        Ok(self.path.clone())
      }
      Err(e) => {
        warn!("模型下载失败: {}", e);
        let _ = tokio::fs::remove_file(&partial).await;
        Err(e)
      }
    }
  }

  async fn download(&self, partial: &Path) -> Result<u64, ProvisionError> {
    let response = self
      .client
      .get(self.url.clone())
      .send()
      .await?
      .error_for_status()?;

    let mut file = tokio::fs::File::create(partial).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
      let chunk = chunk?;
      file.write_all(&chunk).await?;
      written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
  }
}

fn partial_path(path: &Path) -> PathBuf {
  let mut name = path.as_os_str().to_owned();
  name.push(".part");
  PathBuf::from(name)
}
