// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bot/temp.rs - 请求期间的临时文件
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

use tracing::{debug, warn};

/// 离开作用域时删除登记过的文件，删除失败只记录日志
#[derive(Debug, Default)]
pub struct TempFiles {
  paths: Vec<PathBuf>,
}

impl TempFiles {
  pub fn new() -> Self {
    Self::default()
  }

  /// 登记一个临时文件并返回其路径
  pub fn track(&mut self, path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    self.paths.push(path.clone());
    path
  }

  #[cfg(test)]
  fn paths(&self) -> &[PathBuf] {
    &self.paths
  }
}

impl Drop for TempFiles {
  fn drop(&mut self) {
    for path in &self.paths {
      remove_quietly(path);
    }
  }
}

fn remove_quietly(path: &Path) {
  match std::fs::remove_file(path) {
    Ok(()) => debug!("删除临时文件: {}", path.display()),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
    Err(e) => warn!("无法删除临时文件 {}: {}", path.display(), e),
  }
}
