// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/font.rs - 标注字体
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

use ab_glyph::{FontVec, PxScale};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use tracing::{debug, warn};

/// 按顺序尝试的系统字体
pub const FONT_SEARCH_PATHS: [&str; 4] = [
  "C:/Windows/Fonts/arial.ttf",
  "C:/Windows/Fonts/tahoma.ttf",
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/System/Library/Fonts/Arial.ttf",
];

const LABEL_FONT_SIZE: f32 = 20.0;
const BITMAP_GLYPH_SIZE: u32 = 8;
const BITMAP_SCALE: u32 = 2;

pub enum LabelFont {
  /// 系统 TrueType 字体
  Vector { font: FontVec, scale: PxScale },
  /// 内置 8x8 点阵字体，找不到系统字体时使用
  Bitmap { scale: u32 },
}

impl Default for LabelFont {
  fn default() -> Self {
    LabelFont::Bitmap {
      scale: BITMAP_SCALE,
    }
  }
}

impl LabelFont {
  pub fn lookup() -> Self {
    Self::lookup_in(FONT_SEARCH_PATHS.iter().map(Path::new))
  }

  pub fn lookup_in<'p>(paths: impl IntoIterator<Item = &'p Path>) -> Self {
    for path in paths {
      if !path.exists() {
        continue;
      }
      match std::fs::read(path).map(FontVec::try_from_vec) {
        Ok(Ok(font)) => {
          debug!("使用字体: {}", path.display());
          return LabelFont::Vector {
            font,
            scale: PxScale::from(LABEL_FONT_SIZE),
          };
        }
        Ok(Err(e)) => warn!("字体无效 {}: {}", path.display(), e),
        Err(e) => warn!("无法读取字体 {}: {}", path.display(), e),
      }
    }

    warn!("未找到可用字体，使用内置点阵字体");
    LabelFont::default()
  }

  #[cfg(test)]
  fn is_bitmap(&self) -> bool {
    matches!(self, LabelFont::Bitmap { .. })
  }

  /// 文本渲染后的 (宽, 高)
  pub fn text_size(&self, text: &str) -> (u32, u32) {
    match self {
      LabelFont::Vector { font, scale } => text_size(*scale, font, text),
      LabelFont::Bitmap { scale } => {
        let cell = BITMAP_GLYPH_SIZE * scale;
        (text.chars().count() as u32 * cell, cell)
      }
    }
  }

  pub fn draw_text(&self, image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, text: &str) {
    match self {
      LabelFont::Vector { font, scale } => draw_text_mut(image, color, x, y, *scale, font, text),
      LabelFont::Bitmap { scale } => draw_bitmap_text(image, color, x, y, *scale, text),
    }
  }
}

fn draw_bitmap_text(image: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: u32, text: &str) {
  let cell = (BITMAP_GLYPH_SIZE * scale) as i32;
  let scale = scale as i32;

  for (index, ch) in text.chars().enumerate() {
    let Some(glyph) = BASIC_FONTS.get(ch).or_else(|| BASIC_FONTS.get('?')) else {
      continue;
    };
    let origin_x = x + index as i32 * cell;

    for (row, bits) in glyph.iter().enumerate() {
      for col in 0..BITMAP_GLYPH_SIZE as i32 {
        if bits & (1 << col) == 0 {
          continue;
        }
        for dy in 0..scale {
          for dx in 0..scale {
            let px = origin_x + col * scale + dx;
            let py = y + row as i32 * scale + dy;
            if px >= 0 && py >= 0 && (px as u32) < image.width() && (py as u32) < image.height() {
              image.put_pixel(px as u32, py as u32, color);
            }
          }
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_fonts_fall_back_to_bitmap() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.ttf");
    let broken = dir.path().join("broken.ttf");
    std::fs::write(&broken, b"not a font").unwrap();

    let font = LabelFont::lookup_in([missing.as_path(), broken.as_path()]);
    assert!(font.is_bitmap());
  }

  #[test]
  fn bitmap_text_size_scales_with_length() {
    let font = LabelFont::default();
    assert_eq!(font.text_size("abc"), (48, 16));
    assert_eq!(font.text_size(""), (0, 16));
  }

  #[test]
  fn bitmap_text_touches_pixels_and_clips() {
    let mut image = RgbImage::new(20, 20);
    let font = LabelFont::default();
    font.draw_text(&mut image, Rgb([255, 255, 255]), -4, -4, "HI");
    font.draw_text(&mut image, Rgb([255, 255, 255]), 2, 2, "A");
    assert!(image.pixels().any(|p| p.0 == [255, 255, 255]));
  }
}
