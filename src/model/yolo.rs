// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/yolo.rs - YOLOv8 目标检测器 (ONNX Runtime)
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
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{RgbNchwFrame, read_rgb_image},
  model::{COCO_CLASSES, DetectError, Detection, Detector},
};

const YOLO_INPUT_SIZE: u32 = 640;
const YOLO_BOX_FIELDS: usize = 4;
const YOLO_NMS_THRESHOLD: f32 = 0.45;
const YOLO_INTRA_THREADS: usize = 4;

pub struct YoloBuilder {
  model_path: PathBuf,
  nms_threshold: f32,
  intra_threads: usize,
}

impl FromUrlWithScheme for YoloBuilder {
  const SCHEME: &'static str = "yolo";
}

impl FromUrl for YoloBuilder {
  type Error = DetectError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DetectError::ModelPath(format!(
        "模型路径必须使用 {} 方案, 实际为 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    // yolo://models/x.onnx 为相对路径，yolo:///opt/x.onnx 为绝对路径
    let path = match url.host_str() {
      Some(host) if !host.is_empty() => format!("{}{}", host, url.path()),
      _ => url.path().to_string(),
    };
    if path.is_empty() || path == "/" {
      return Err(DetectError::ModelPath(format!("缺少模型文件路径: {}", url)));
    }

    Ok(Self::new(path))
  }
}

impl YoloBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      nms_threshold: YOLO_NMS_THRESHOLD,
      intra_threads: YOLO_INTRA_THREADS,
    }
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  pub fn nms_threshold(mut self, threshold: f32) -> Self {
    self.nms_threshold = threshold.clamp(0.0, 1.0);
    self
  }

  pub fn intra_threads(mut self, threads: usize) -> Self {
    self.intra_threads = threads.max(1);
    self
  }

  pub fn build(&self) -> Result<YoloDetector, DetectError> {
    info!("加载模型文件: {}", self.model_path.display());
    let session = Session::builder()
      .map_err(load_error)?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(load_error)?
      .with_intra_threads(self.intra_threads)
      .map_err(load_error)?
      .commit_from_file(&self.model_path)
      .map_err(load_error)?;

    let input_name = session
      .inputs
      .first()
      .map(|input| input.name.clone())
      .unwrap_or_else(|| "images".to_string());
    debug!("模型输入名称: {}", input_name);

    Ok(YoloDetector {
      session: Mutex::new(session),
      input_name,
      nms_threshold: self.nms_threshold,
    })
  }
}

/// YOLOv8 检测器，输出形状为 [1, 4 + 类别数, 候选框数]
pub struct YoloDetector {
  session: Mutex<Session>,
  input_name: String,
  nms_threshold: f32,
}

struct Candidate {
  class_id: usize,
  score: f32,
  bbox: [f32; 4],
}

impl YoloDetector {
  fn infer(&self, frame: RgbNchwFrame) -> Result<Vec<Candidate>, DetectError> {
    let shape = (1, frame.channels(), frame.height(), frame.width());
    let array = Array4::from_shape_vec(shape, frame.into_vec())
      .map_err(|e| DetectError::Inference(e.to_string()))?;
    let input = Tensor::from_array(array).map_err(|e| DetectError::Inference(e.to_string()))?;

    let mut session = self
      .session
      .lock()
      .map_err(|_| DetectError::Inference("推理会话锁已损坏".to_string()))?;
    let outputs = session
      .run(ort::inputs![self.input_name.as_str() => input])
      .map_err(|e| DetectError::Inference(e.to_string()))?;
    let output = outputs[0]
      .try_extract_array::<f32>()
      .map_err(|e| DetectError::Inference(e.to_string()))?;

    let dims = output.shape().to_vec();
    debug!("模型输出形状: {:?}", dims);
    if dims.len() != 3 || dims[1] <= YOLO_BOX_FIELDS {
      return Err(DetectError::Inference(format!("模型输出形状异常: {:?}", dims)));
    }

    let num_classes = dims[1] - YOLO_BOX_FIELDS;
    let num_boxes = dims[2];
    let mut candidates = Vec::new();

    for i in 0..num_boxes {
      let (class_id, score) = (0..num_classes)
        .map(|c| (c, output[[0, YOLO_BOX_FIELDS + c, i]]))
        .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

      if score <= 0.0 {
        continue;
      }

      let cx = output[[0, 0, i]];
      let cy = output[[0, 1, i]];
      let w = output[[0, 2, i]];
      let h = output[[0, 3, i]];

      candidates.push(Candidate {
        class_id,
        score,
        bbox: [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0],
      });
    }

    Ok(candidates)
  }
}

impl Detector for YoloDetector {
  fn detect(&self, image: &Path, min_confidence: f32) -> Result<Vec<Detection>, DetectError> {
    let image = read_rgb_image(image)?;
    let (original_width, original_height) = (image.width() as f32, image.height() as f32);

    // 预处理
    let frame = RgbNchwFrame::resized_from(&image, YOLO_INPUT_SIZE, YOLO_INPUT_SIZE);

    let now = std::time::Instant::now();
    let threshold = (min_confidence / 100.0).clamp(0.0, 1.0);
    let candidates = self
      .infer(frame)?
      .into_iter()
      .filter(|c| c.score >= threshold)
      .collect();
    debug!("推理完成，耗时: {:.2?}", now.elapsed());

    // 缩放到原始图像尺寸
    let scale_x = original_width / YOLO_INPUT_SIZE as f32;
    let scale_y = original_height / YOLO_INPUT_SIZE as f32;

    let detections = nms(candidates, self.nms_threshold)
      .into_iter()
      .filter_map(|c| {
        let bbox = [
          (c.bbox[0] * scale_x).clamp(0.0, original_width),
          (c.bbox[1] * scale_y).clamp(0.0, original_height),
          (c.bbox[2] * scale_x).clamp(0.0, original_width),
          (c.bbox[3] * scale_y).clamp(0.0, original_height),
        ];
        if bbox[0] >= bbox[2] || bbox[1] >= bbox[3] {
          return None;
        }
        let label = COCO_CLASSES.get(c.class_id).copied().unwrap_or("unknown");
        Some(Detection::new(label, c.score * 100.0, bbox))
      })
      .collect::<Vec<_>>();

    info!("检测到 {} 个物体", detections.len());
    Ok(detections)
  }
}

fn load_error(e: impl std::fmt::Display) -> DetectError {
  DetectError::ModelLoad(e.to_string())
}

/// 按类别进行的非极大值抑制，结果按置信度降序
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept: Vec<Candidate> = Vec::new();
  for candidate in candidates {
    let suppressed = kept
      .iter()
      .any(|k| k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) >= iou_threshold);
    if !suppressed {
      kept.push(candidate);
    }
  }
  kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
  let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn candidate(class_id: usize, score: f32, bbox: [f32; 4]) -> Candidate {
    Candidate {
      class_id,
      score,
      bbox,
    }
  }

  #[test]
  fn overlapping_boxes_of_same_class_are_merged() {
    let kept = nms(
      vec![
        candidate(2, 0.6, [0.0, 0.0, 10.0, 10.0]),
        candidate(2, 0.9, [1.0, 1.0, 11.0, 11.0]),
        candidate(0, 0.7, [1.0, 1.0, 11.0, 11.0]),
        candidate(2, 0.5, [50.0, 50.0, 60.0, 60.0]),
      ],
      0.45,
    );

    let scores: Vec<f32> = kept.iter().map(|c| c.score).collect();
    assert_eq!(scores, vec![0.9, 0.7, 0.5]);
  }

  #[test]
  fn iou_of_disjoint_and_identical_boxes() {
    let a = [0.0, 0.0, 10.0, 10.0];
    assert_eq!(iou(&a, &[20.0, 20.0, 30.0, 30.0]), 0.0);
    assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    assert_eq!(iou(&[0.0, 0.0, 0.0, 0.0], &[0.0, 0.0, 0.0, 0.0]), 0.0);
  }

  #[test]
  fn builder_accepts_relative_and_absolute_urls() {
    let relative = YoloBuilder::from_url(&Url::parse("yolo://models/yolov8n.onnx").unwrap()).unwrap();
    assert_eq!(relative.model_path(), Path::new("models/yolov8n.onnx"));

    let absolute = YoloBuilder::from_url(&Url::parse("yolo:///opt/yolov8n.onnx").unwrap()).unwrap();
    assert_eq!(absolute.model_path(), Path::new("/opt/yolov8n.onnx"));

    assert!(YoloBuilder::from_url(&Url::parse("file:///opt/yolov8n.onnx").unwrap()).is_err());
  }
}
