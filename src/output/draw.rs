// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use chrono::{DateTime, Local};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

use crate::{
  analysis::{Analysis, EnrichedDetection, RiskTier, estimate_distance},
  output::font::LabelFont,
};

// 文本渲染常量
const BOX_THICKNESS: i32 = 3;
const LABEL_OFFSET: i32 = 35;
const LABEL_TEXT_PADDING: i32 = 5;
const DISTANCE_OFFSET: i32 = 5;
const TIMESTAMP_POSITION: (i32, i32) = (10, 10);
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// 按风险等级选择边框颜色
pub fn tier_color(tier: RiskTier) -> Rgb<u8> {
  match tier {
    RiskTier::VeryHigh => Rgb([220, 20, 20]),
    RiskTier::High => Rgb([255, 140, 0]),
    RiskTier::Medium => Rgb([230, 200, 0]),
    RiskTier::Low | RiskTier::Informational | RiskTier::Unknown => Rgb([30, 170, 60]),
  }
}

pub fn label_text(item: &EnrichedDetection) -> String {
  format!("{} {:.1}%", item.display_name, item.confidence())
}

pub struct Draw {
  font: LabelFont,
}

impl Default for Draw {
  fn default() -> Self {
    Self::new(LabelFont::lookup())
  }
}

impl Draw {
  pub fn new(font: LabelFont) -> Self {
    Self { font }
  }

  pub fn draw_analysis(&self, image: &mut RgbImage, analysis: &Analysis, at: DateTime<Local>) {
    for item in &analysis.items {
      self.draw_item(image, item);
    }

    let timestamp = format!("Analysis: {}", at.format("%Y-%m-%d %H:%M:%S"));
    let (x, y) = TIMESTAMP_POSITION;
    self.font.draw_text(image, TEXT_COLOR, x, y, &timestamp);
  }

  fn draw_item(&self, image: &mut RgbImage, item: &EnrichedDetection) {
    let color = tier_color(item.tier);
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }
    let bbox = item.bbox();

    let x_min = (bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[3].ceil() as i32).clamp(0, h - 1);

    // 边框向内加粗
    for t in 0..BOX_THICKNESS {
      let width = x_max - x_min - 2 * t + 1;
      let height = y_max - y_min - 2 * t + 1;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }

    // 标签画在边框上方
    let label = label_text(item);
    let label_x = x_min;
    let label_y = (y_min - LABEL_OFFSET).max(0);
    let (text_w, text_h) = self.font.text_size(&label);
    let background_w = (text_w as i32 + 2 * LABEL_TEXT_PADDING).min(w - label_x);
    let background_h = text_h as i32 + LABEL_TEXT_PADDING;
    if background_w > 0 && background_h > 0 {
      let rect = Rect::at(label_x, label_y).of_size(background_w as u32, background_h as u32);
      draw_filled_rect_mut(image, rect, color);
    }
    self.font.draw_text(
      image,
      TEXT_COLOR,
      label_x + LABEL_TEXT_PADDING,
      label_y,
      &label,
    );

    // 距离信息画在边框下方
    let distance = estimate_distance(bbox, image.width());
    let distance_text = format!("Distance: {}", distance);
    self
      .font
      .draw_text(image, color, x_min, y_max + DISTANCE_OFFSET, &distance_text);
  }
}
