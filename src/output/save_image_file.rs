// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像文件
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

use chrono::Local;
use tracing::debug;

use crate::{
  analysis::Analysis,
  frame::read_rgb_image,
  output::{Render, RenderError, draw::Draw, font::LabelFont},
};

#[derive(Default)]
pub struct SaveImageFileOutput {
  draw: Draw,
}

impl SaveImageFileOutput {
  pub fn new(font: LabelFont) -> Self {
    Self {
      draw: Draw::new(font),
    }
  }

  fn save_image(&self, image: image::RgbImage, path: &Path) -> Result<(), RenderError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(path)?;
    debug!("保存图像到文件: {}", path.display());

    Ok(())
  }
}

impl Render for SaveImageFileOutput {
  fn render_result(
    &self,
    source: &Path,
    analysis: &Analysis,
    output: &Path,
  ) -> Result<PathBuf, RenderError> {
    let mut image = read_rgb_image(source)?;
    self.draw.draw_analysis(&mut image, analysis, Local::now());
    self.save_image(image, output)?;
    Ok(output.to_path_buf())
  }
}
