// 该文件是 Shanan （山南西风） 项目的一部分。
// src/analysis.rs - 检测结果分类与风险评估
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

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use tracing::debug;

use crate::model::Detection;

pub mod distance;
pub use self::distance::{DistanceBucket, estimate_distance};

/// 风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskTier {
  Informational,
  Low,
  Medium,
  High,
  VeryHigh,
  /// 不在分类表中的目标
  Unknown,
}

impl RiskTier {
  pub fn is_dangerous(self) -> bool {
    matches!(self, RiskTier::High | RiskTier::VeryHigh)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      RiskTier::Informational => "informational",
      RiskTier::Low => "low",
      RiskTier::Medium => "medium",
      RiskTier::High => "high",
      RiskTier::VeryHigh => "very high",
      RiskTier::Unknown => "unknown",
    }
  }
}

impl fmt::Display for RiskTier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxonomyEntry {
  pub display_name: &'static str,
  pub tier: RiskTier,
}

const TAXONOMY_ENTRIES: [(&str, &str, RiskTier); 14] = [
  ("person", "Person", RiskTier::High),
  ("bicycle", "Bicycle", RiskTier::Medium),
  ("car", "Car", RiskTier::Medium),
  ("motorcycle", "Motorcycle", RiskTier::High),
  ("bus", "Bus", RiskTier::Medium),
  ("truck", "Truck", RiskTier::High),
  ("train", "Train", RiskTier::VeryHigh),
  ("traffic light", "Traffic light", RiskTier::Informational),
  ("stop sign", "Stop sign", RiskTier::High),
  ("cat", "Cat", RiskTier::Low),
  ("dog", "Dog", RiskTier::Low),
  ("bird", "Bird", RiskTier::Low),
  ("chair", "Chair", RiskTier::Low),
  ("table", "Table", RiskTier::Low),
];

static TAXONOMY: LazyLock<HashMap<&'static str, TaxonomyEntry>> = LazyLock::new(|| {
  TAXONOMY_ENTRIES
    .iter()
    .map(|&(label, display_name, tier)| (label, TaxonomyEntry { display_name, tier }))
    .collect()
});

/// 查找类别（小写、精确匹配）
pub fn lookup(label: &str) -> Option<TaxonomyEntry> {
  TAXONOMY.get(label).copied()
}

/// 附加了显示名称、风险等级和时间戳的检测结果
#[derive(Debug, Clone)]
pub struct EnrichedDetection {
  pub detection: Detection,
  pub display_name: String,
  pub tier: RiskTier,
  pub analyzed_at: DateTime<Local>,
}

impl EnrichedDetection {
  pub fn confidence(&self) -> f32 {
    self.detection.confidence
  }

  pub fn bbox(&self) -> &[f32; 4] {
    &self.detection.bbox
  }
}

/// 一张图像的分析结果，保持检测顺序
#[derive(Debug, Clone, Default)]
pub struct Analysis {
  pub items: Vec<EnrichedDetection>,
  pub danger_count: usize,
}

impl Analysis {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

pub fn enrich(detections: Vec<Detection>) -> Analysis {
  enrich_at(detections, Local::now())
}

pub fn enrich_at(detections: Vec<Detection>, analyzed_at: DateTime<Local>) -> Analysis {
  let mut danger_count = 0;
  let items = detections
    .into_iter()
    .map(|detection| {
      let label = detection.label.to_lowercase();
      let (display_name, tier) = match lookup(&label) {
        Some(entry) => (entry.display_name.to_string(), entry.tier),
        None => (label, RiskTier::Unknown),
      };
      if tier.is_dangerous() {
        danger_count += 1;
      }
      EnrichedDetection {
        detection,
        display_name,
        tier,
        analyzed_at,
      }
    })
    .collect::<Vec<_>>();

  debug!("分类完成: {} 个目标, {} 个危险目标", items.len(), danger_count);
  Analysis {
    items,
    danger_count,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(label: &str, confidence: f32) -> Detection {
    Detection::new(label, confidence, [0.0, 0.0, 10.0, 10.0])
  }

  #[test]
  fn person_is_high_risk_and_dangerous() {
    let analysis = enrich(vec![det("person", 91.2)]);
    let item = &analysis.items[0];
    assert_eq!(item.display_name, "Person");
    assert_eq!(item.tier, RiskTier::High);
    assert_eq!(item.confidence(), 91.2);
    assert_eq!(analysis.danger_count, 1);
  }

  #[test]
  fn unknown_labels_keep_raw_name() {
    let analysis = enrich(vec![det("Umbrella", 55.0)]);
    assert_eq!(analysis.items[0].display_name, "umbrella");
    assert_eq!(analysis.items[0].tier, RiskTier::Unknown);
    assert_eq!(analysis.danger_count, 0);
  }

  #[test]
  fn order_and_count_are_preserved() {
    let labels = ["dog", "kite", "train", "car", "truck", "dog", "stop sign"];
    let input: Vec<Detection> = labels.iter().map(|l| det(l, 50.0)).collect();
    let analysis = enrich(input.clone());

    assert_eq!(analysis.len(), input.len());
    for (item, original) in analysis.items.iter().zip(&input) {
      assert_eq!(&item.detection, original);
    }

    let dangerous = analysis.items.iter().filter(|i| i.tier.is_dangerous()).count();
    assert_eq!(analysis.danger_count, dangerous);
    assert_eq!(analysis.danger_count, 3);
  }

  #[test]
  fn very_high_counts_but_medium_does_not() {
    let analysis = enrich(vec![det("train", 70.0), det("bus", 70.0), det("traffic light", 80.0)]);
    assert_eq!(analysis.items[0].tier, RiskTier::VeryHigh);
    assert_eq!(analysis.items[2].tier, RiskTier::Informational);
    assert_eq!(analysis.danger_count, 1);
  }

  #[test]
  fn empty_input_is_empty_analysis() {
    let analysis = enrich(Vec::new());
    assert!(analysis.is_empty());
    assert_eq!(analysis.danger_count, 0);
  }
}
