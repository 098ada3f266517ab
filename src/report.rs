// 该文件是 Shanan （山南西风） 项目的一部分。
// src/report.rs - 文字报告
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

use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::analysis::{Analysis, EnrichedDetection, RiskTier};

mod chunk;
pub use self::chunk::split_message;

pub const CAPTION_LIMIT: usize = 1024;
pub const REPORT_LIMIT: usize = 4000;
pub const TRUNCATION_MARKER: &str = "\n\n... (report truncated)";
pub const EMPTY_REPORT: &str = "❌ No objects detected in the image.";

const TOP_N: usize = 3;

/// 照片说明：数量、危险数量与置信度前三的目标
pub fn short_caption(analysis: &Analysis) -> String {
  let mut caption = format!("🔍 Detected: {} objects", analysis.len());
  if analysis.danger_count > 0 {
    let _ = write!(caption, " ⚠️ Dangerous: {}", analysis.danger_count);
  }

  if !analysis.is_empty() {
    // 稳定排序，同分保持原顺序
    let mut ranked: Vec<&EnrichedDetection> = analysis.items.iter().collect();
    ranked.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
    let names = ranked
      .iter()
      .take(TOP_N)
      .map(|item| item.display_name.as_str())
      .collect::<Vec<_>>()
      .join(", ");
    let _ = write!(caption, "\n📋 Top-3: {}", names);
  }

  truncate_chars(&caption, CAPTION_LIMIT).to_string()
}

struct Group<'a> {
  name: &'a str,
  tier: RiskTier,
  count: usize,
  max_confidence: f32,
}

pub fn detailed_report(analysis: &Analysis) -> String {
  detailed_report_at(analysis, Local::now())
}

/// 详细报告：按显示名称分组，超过上限时截断
pub fn detailed_report_at(analysis: &Analysis, at: DateTime<Local>) -> String {
  if analysis.is_empty() {
    return EMPTY_REPORT.to_string();
  }

  let mut report = String::from("📊 DETAILED REPORT\n\n");
  let _ = writeln!(report, "• Total objects: {}", analysis.len());
  let _ = writeln!(report, "• Potentially dangerous: {}\n", analysis.danger_count);

  let mut groups: Vec<Group> = Vec::new();
  for item in &analysis.items {
    match groups.iter_mut().find(|g| g.name == item.display_name) {
      Some(group) => {
        group.count += 1;
        group.max_confidence = group.max_confidence.max(item.confidence());
      }
      None => groups.push(Group {
        name: &item.display_name,
        tier: item.tier,
        count: 1,
        max_confidence: item.confidence(),
      }),
    }
  }

  report.push_str("Detected objects:\n");
  for group in &groups {
    let marker = if group.tier.is_dangerous() { "⚠️" } else { "✅" };
    let _ = writeln!(
      report,
      "{} {}: {} pcs. (max confidence: {:.1}%)",
      marker, group.name, group.count, group.max_confidence
    );
  }

  // 同分取最先出现的目标
  let mut best = &analysis.items[0];
  for item in &analysis.items[1..] {
    if item.confidence() > best.confidence() {
      best = item;
    }
  }
  let _ = write!(
    report,
    "\n🎯 Most confident object: {} ({:.1}%)",
    best.display_name,
    best.confidence()
  );
  let _ = write!(report, "\n\n⏰ Analysis time: {}", at.format("%H:%M:%S"));

  cap_report(report)
}

/// 超过 4000 字符时截断并附加标记
pub fn cap_report(report: String) -> String {
  if report.chars().count() <= REPORT_LIMIT {
    return report;
  }
  let mut capped = truncate_chars(&report, REPORT_LIMIT).to_string();
  capped.push_str(TRUNCATION_MARKER);
  capped
}

fn truncate_chars(text: &str, limit: usize) -> &str {
  match text.char_indices().nth(limit) {
    Some((idx, _)) => &text[..idx],
    None => text,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::analysis::enrich;
  use crate::model::Detection;

  fn analysis_of(items: &[(&str, f32)]) -> Analysis {
    enrich(
      items
        .iter()
        .map(|&(label, conf)| Detection::new(label, conf, [0.0, 0.0, 10.0, 10.0]))
        .collect(),
    )
  }

  #[test]
  fn caption_lists_top_three_by_confidence() {
    let analysis = analysis_of(&[("dog", 50.0), ("person", 91.2), ("car", 70.0), ("bird", 80.0)]);
    let caption = short_caption(&analysis);
    assert_eq!(
      caption,
      "🔍 Detected: 4 objects ⚠️ Dangerous: 1\n📋 Top-3: Person, Bird, Car"
    );
  }

  #[test]
  fn caption_ties_keep_original_order() {
    let analysis = analysis_of(&[("cat", 60.0), ("dog", 60.0), ("bird", 60.0), ("chair", 60.0)]);
    assert!(short_caption(&analysis).ends_with("Top-3: Cat, Dog, Bird"));
  }

  #[test]
  fn empty_caption_reports_zero() {
    let caption = short_caption(&Analysis::default());
    assert_eq!(caption, "🔍 Detected: 0 objects");
  }

  #[test]
  fn caption_is_capped() {
    let long_label = "x".repeat(3000);
    let analysis = analysis_of(&[(long_label.as_str(), 50.0)]);
    assert_eq!(short_caption(&analysis).chars().count(), CAPTION_LIMIT);
  }

  #[test]
  fn empty_report_is_fixed_message() {
    assert_eq!(detailed_report(&Analysis::default()), EMPTY_REPORT);
  }

  #[test]
  fn duplicates_are_grouped_with_max_confidence() {
    let analysis = analysis_of(&[("car", 62.5), ("person", 91.2), ("car", 88.1)]);
    let report = detailed_report(&analysis);

    assert!(report.contains("• Total objects: 3"));
    assert!(report.contains("• Potentially dangerous: 1"));
    assert!(report.contains("✅ Car: 2 pcs. (max confidence: 88.1%)"));
    assert!(report.contains("⚠️ Person: 1 pcs. (max confidence: 91.2%)"));
    assert_eq!(report.matches("Car:").count(), 1);
    // 分组按首次出现的顺序
    assert!(report.find("Car:").unwrap() < report.find("Person:").unwrap());
    assert!(report.contains("🎯 Most confident object: Person (91.2%)"));
    assert!(report.contains("⏰ Analysis time: "));
  }

  #[test]
  fn most_confident_tie_goes_to_first() {
    let analysis = analysis_of(&[("dog", 75.0), ("cat", 75.0)]);
    assert!(detailed_report(&analysis).contains("Most confident object: Dog (75.0%)"));
  }

  #[test]
  fn long_reports_are_truncated() {
    let report = "a".repeat(REPORT_LIMIT + 123);
    let capped = cap_report(report);
    assert!(capped.ends_with(TRUNCATION_MARKER));
    assert_eq!(
      capped.chars().count(),
      REPORT_LIMIT + TRUNCATION_MARKER.chars().count()
    );

    let exact = "b".repeat(REPORT_LIMIT);
    assert_eq!(cap_report(exact.clone()), exact);
  }

  #[test]
  fn truncation_respects_multibyte_chars() {
    let report = "ж".repeat(REPORT_LIMIT + 1);
    let capped = cap_report(report);
    assert!(capped.starts_with(&"ж".repeat(REPORT_LIMIT)));
    assert_eq!(capped.chars().filter(|&c| c == 'ж').count(), REPORT_LIMIT);
  }

  #[test]
  fn many_distinct_labels_stay_within_cap() {
    let labels: Vec<String> = (0..300).map(|i| format!("object-number-{i}")).collect();
    let analysis = analysis_of(
      &labels
        .iter()
        .map(|l| (l.as_str(), 50.0))
        .collect::<Vec<_>>(),
    );
    let report = detailed_report(&analysis);
    assert!(report.ends_with(TRUNCATION_MARKER));
    assert!(report.chars().count() <= REPORT_LIMIT + TRUNCATION_MARKER.chars().count());
  }
}
