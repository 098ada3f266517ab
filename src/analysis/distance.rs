// 该文件是 Shanan （山南西风） 项目的一部分。
// src/analysis/distance.rs - 距离估计
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

const VERY_CLOSE_RATIO: f32 = 0.30;
const CLOSE_RATIO: f32 = 0.15;
const MEDIUM_RATIO: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceBucket {
  VeryClose,
  Close,
  Medium,
  Far,
}

impl DistanceBucket {
  pub fn as_str(self) -> &'static str {
    match self {
      DistanceBucket::VeryClose => "very close (<10m)",
      DistanceBucket::Close => "close (10-25m)",
      DistanceBucket::Medium => "medium (25-50m)",
      DistanceBucket::Far => "far (>50m)",
    }
  }
}

impl fmt::Display for DistanceBucket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 目标面积与图像宽度平方之比，假设画面接近正方形
pub fn size_ratio(bbox: &[f32; 4], image_width: u32) -> f32 {
  let width = (bbox[2] - bbox[0]).max(0.0);
  let height = (bbox[3] - bbox[1]).max(0.0);
  let area = image_width as f32 * image_width as f32;
  if area <= 0.0 {
    return 0.0;
  }
  width * height / area
}

/// 目标越大越近，阈值为开区间
pub fn estimate_distance(bbox: &[f32; 4], image_width: u32) -> DistanceBucket {
  let ratio = size_ratio(bbox, image_width);
  if ratio > VERY_CLOSE_RATIO {
    DistanceBucket::VeryClose
  } else if ratio > CLOSE_RATIO {
    DistanceBucket::Close
  } else if ratio > MEDIUM_RATIO {
    DistanceBucket::Medium
  } else {
    DistanceBucket::Far
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn buckets_by_area_ratio() {
    // 图像宽 100，面积基准 10000
    assert_eq!(estimate_distance(&[0.0, 0.0, 60.0, 60.0], 100), DistanceBucket::VeryClose);
    assert_eq!(estimate_distance(&[0.0, 0.0, 40.0, 50.0], 100), DistanceBucket::Close);
    assert_eq!(estimate_distance(&[0.0, 0.0, 30.0, 30.0], 100), DistanceBucket::Medium);
    assert_eq!(estimate_distance(&[0.0, 0.0, 10.0, 10.0], 100), DistanceBucket::Far);
  }

  #[test]
  fn thresholds_are_exclusive() {
    // 0.30、0.15、0.05 都恰好落入下一档
    assert_eq!(estimate_distance(&[0.0, 0.0, 50.0, 60.0], 100), DistanceBucket::Close);
    assert_eq!(estimate_distance(&[0.0, 0.0, 50.0, 30.0], 100), DistanceBucket::Medium);
    assert_eq!(estimate_distance(&[0.0, 0.0, 50.0, 10.0], 100), DistanceBucket::Far);
  }

  #[test]
  fn degenerate_boxes_are_far() {
    assert_eq!(estimate_distance(&[5.0, 5.0, 5.0, 80.0], 100), DistanceBucket::Far);
    assert_eq!(estimate_distance(&[0.0, 0.0, 10.0, 10.0], 0), DistanceBucket::Far);
  }

  #[test]
  fn labels_match_buckets() {
    assert_eq!(DistanceBucket::VeryClose.to_string(), "very close (<10m)");
    assert_eq!(DistanceBucket::Far.to_string(), "far (>50m)");
  }
}
