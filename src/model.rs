// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 检测模型
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
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

mod coco;
mod provision;
pub use self::coco::COCO_CLASSES;
pub use self::provision::{ModelProvisioner, ProvisionError};

#[cfg(feature = "model_yolo")]
mod yolo;
#[cfg(feature = "model_yolo")]
pub use self::yolo::{YoloBuilder, YoloDetector};

/// 单个检测目标
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// 模型给出的类别名称
  pub label: String,
  /// 置信度，百分比 (0 - 100)
  pub confidence: f32,
  /// 源图像像素坐标 [x_min, y_min, x_max, y_max]
  pub bbox: [f32; 4],
}

impl Detection {
  pub fn new(label: impl Into<String>, confidence: f32, bbox: [f32; 4]) -> Self {
    Self {
      label: label.into(),
      confidence,
      bbox,
    }
  }

  pub fn width(&self) -> f32 {
    (self.bbox[2] - self.bbox[0]).max(0.0)
  }

  pub fn height(&self) -> f32 {
    (self.bbox[3] - self.bbox[1]).max(0.0)
  }
}

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("模型下载失败: {0}")]
  ModelDownload(#[from] ProvisionError),
  #[error("模型加载错误: {0}")]
  ModelLoad(String),
  #[error("模型路径错误: {0}")]
  ModelPath(String),
  #[error("推理错误: {0}")]
  Inference(String),
  #[error("图像错误: {0}")]
  Image(#[from] image::ImageError),
}

/// 目标检测能力，具体的推理后端藏在这个接口之后
pub trait Detector {
  /// 检测图像中置信度不低于 `min_confidence`（百分比）的目标
  fn detect(&self, image: &Path, min_confidence: f32) -> Result<Vec<Detection>, DetectError>;
}

/// 按需准备好检测器（下载模型、加载会话）
#[async_trait]
pub trait DetectorProvider: Send + Sync {
  type Detector: Detector + Send + Sync;

  async fn detector(&self) -> Result<&Self::Detector, DetectError>;

  fn is_loaded(&self) -> bool;
}

type DetectorLoader<D> = Box<dyn Fn(&Path) -> Result<D, DetectError> + Send + Sync>;

/// 首次使用时下载并加载模型，此后复用同一个检测器
pub struct ProvisionedDetector<D> {
  provisioner: ModelProvisioner,
  loader: DetectorLoader<D>,
  detector: OnceCell<D>,
}

impl<D> ProvisionedDetector<D> {
  pub fn new<F>(provisioner: ModelProvisioner, loader: F) -> Self
  where
    F: Fn(&Path) -> Result<D, DetectError> + Send + Sync + 'static,
  {
    Self {
      provisioner,
      loader: Box::new(loader),
      detector: OnceCell::new(),
    }
  }
}

#[async_trait]
impl<D: Detector + Send + Sync> DetectorProvider for ProvisionedDetector<D> {
  type Detector = D;

  async fn detector(&self) -> Result<&D, DetectError> {
    if let Some(detector) = self.detector.get() {
      return Ok(detector);
    }

    let model_path = self.provisioner.ensure().await?;
    self
      .detector
      .get_or_try_init(|| async {
        info!("加载检测模型: {}", model_path.display());
        let now = std::time::Instant::now();
        let detector = (self.loader)(&model_path)?;
        info!("模型加载完成，耗时: {:.2?}", now.elapsed());
        Ok(detector)
      })
      .await
  }

  fn is_loaded(&self) -> bool {
    self.detector.initialized()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct NoopDetector;

  impl Detector for NoopDetector {
    fn detect(&self, _image: &Path, _min_confidence: f32) -> Result<Vec<Detection>, DetectError> {
      Ok(Vec::new())
    }
  }

  #[test]
  fn detection_extent_never_negative() {
    let det = Detection::new("car", 50.0, [10.0, 20.0, 5.0, 60.0]);
    assert_eq!(det.width(), 0.0);
    assert_eq!(det.height(), 40.0);
  }

  #[tokio::test]
  async fn provider_loads_once_with_present_model() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("model.onnx");
    std::fs::write(&model_path, b"weights").unwrap();

    let url = url::Url::parse("http://127.0.0.1:9/model.onnx").unwrap();
    let loads = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let counter = loads.clone();
    let provider = ProvisionedDetector::new(ModelProvisioner::new(url, &model_path), move |_| {
      counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
      Ok(NoopDetector)
    });

    assert!(!provider.is_loaded());
    provider.detector().await.unwrap();
    provider.detector().await.unwrap();
    assert!(provider.is_loaded());
    assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn provider_reports_download_failure() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse("http://127.0.0.1:9/model.onnx").unwrap();
    let provider = ProvisionedDetector::new(
      ModelProvisioner::new(url, dir.path().join("models/model.onnx")),
      |_| Ok(NoopDetector),
    );

    let err = provider.detector().await.err().unwrap();
    assert!(matches!(err, DetectError::ModelDownload(_)));
    assert!(!provider.is_loaded());
  }
}
