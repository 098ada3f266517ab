// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 单张图像的检测任务
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

use thiserror::Error;
use tracing::{debug, info};

use crate::{
  analysis::{Analysis, enrich},
  model::{DetectError, Detector},
  output::{Render, RenderError},
  report::{detailed_report, short_caption},
};

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("检测失败: {0}")]
  Detection(#[from] DetectError),
  #[error("渲染失败: {0}")]
  Render(#[from] RenderError),
}

pub trait Task<D, R>: Sized {
  type Output;
  fn run_task(self, detector: &D, renderer: &R) -> Result<Self::Output, TaskError>;
}

/// 标注后的图像与对应的文字
#[derive(Debug, Clone)]
pub struct AnnotatedReport {
  pub image: PathBuf,
  pub analysis: Analysis,
  pub caption: String,
  pub report: String,
}

#[derive(Debug, Clone)]
pub enum TaskOutcome {
  /// 没有检测到任何目标，不生成图像
  NothingFound,
  Annotated(AnnotatedReport),
}

/// 检测 `input`，把标注结果写到 `output`
#[derive(Debug, Clone)]
pub struct OneShotTask {
  pub input: PathBuf,
  pub output: PathBuf,
  pub min_confidence: f32,
}

impl OneShotTask {
  pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, min_confidence: f32) -> Self {
    Self {
      input: input.into(),
      output: output.into(),
      min_confidence,
    }
  }

  /// 检测并附加风险信息；没有目标时返回 `None`
  pub fn detect<D: Detector>(&self, detector: &D) -> Result<Option<Analysis>, TaskError> {
    info!("开始检测: {}", self.input.display());
    let now = std::time::Instant::now();
    let detections = detector.detect(&self.input, self.min_confidence)?;
    info!(
      "推理完成，检测到 {} 个目标，耗时: {:.2?}",
      detections.len(),
      now.elapsed()
    );

    if detections.is_empty() {
      return Ok(None);
    }
    Ok(Some(enrich(detections)))
  }

  /// 绘制标注图像并生成说明与报告
  pub fn render<R: Render>(
    &self,
    renderer: &R,
    analysis: Analysis,
  ) -> Result<AnnotatedReport, TaskError> {
    let now = std::time::Instant::now();
    let image = renderer.render_result(&self.input, &analysis, &self.output)?;
    debug!("渲染完成，耗时: {:.2?}", now.elapsed());

    let caption = short_caption(&analysis);
    let report = detailed_report(&analysis);
    Ok(AnnotatedReport {
      image,
      analysis,
      caption,
      report,
    })
  }
}

impl<D: Detector, R: Render> Task<D, R> for OneShotTask {
  type Output = TaskOutcome;

  fn run_task(self, detector: &D, renderer: &R) -> Result<TaskOutcome, TaskError> {
    match self.detect(detector)? {
      None => Ok(TaskOutcome::NothingFound),
      Some(analysis) => Ok(TaskOutcome::Annotated(self.render(renderer, analysis)?)),
    }
  }
}
