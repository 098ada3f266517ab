// 该文件是 Shanan （山南西风） 项目的一部分。
// src/report/chunk.rs - 长消息分段
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

/// 把 `text` 切成每段不超过 `max_len` 个字符的片段。
///
/// 优先在换行处切分，其次是句号（后接空白或文本末尾），再次是空格，
/// 都找不到时硬切。切分字符保留在前一段末尾，后一段开头的空白会被去掉。
/// 放得下的文本（包括空文本）原样作为唯一的一段返回。
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
  let max_len = max_len.max(1);
  if text.chars().nth(max_len).is_none() {
    return vec![text.to_string()];
  }

  let mut chunks = Vec::new();
  let mut rest = text;

  while !rest.is_empty() {
    let chars: Vec<(usize, char)> = rest.char_indices().take(max_len + 1).collect();
    if chars.len() <= max_len {
      chunks.push(rest.to_string());
      break;
    }

    let window = &chars[..max_len];
    let cut = find_cut(window, chars[max_len].1).unwrap_or(max_len);
    let byte_end = chars[cut].0;
    chunks.push(rest[..byte_end].to_string());
    rest = rest[byte_end..].trim_start();
  }

  chunks
}

/// 返回切分后第一段的字符数；窗口内没有合适的切分点时返回 `None`
fn find_cut(window: &[(usize, char)], next: char) -> Option<usize> {
  if let Some(pos) = window.iter().rposition(|&(_, c)| c == '\n') {
    return Some(pos + 1);
  }

  let period = (0..window.len()).rev().find(|&i| {
    if window[i].1 != '.' {
      return false;
    }
    let following = window.get(i + 1).map(|&(_, c)| c).unwrap_or(next);
    following.is_whitespace()
  });
  if let Some(pos) = period {
    return Some(pos + 1);
  }

  window
    .iter()
    .rposition(|&(_, c)| c == ' ')
    .map(|pos| pos + 1)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_text_is_one_chunk() {
    assert_eq!(split_message("hello", 10), vec!["hello"]);
    assert_eq!(split_message("exactly10!", 10), vec!["exactly10!"]);
  }

  #[test]
  fn empty_text_is_one_empty_chunk() {
    assert_eq!(split_message("", 10), vec![""]);
  }

  #[test]
  fn prefers_newline() {
    let chunks = split_message("first line\nsecond. line more", 20);
    assert_eq!(chunks, vec!["first line\n", "second. line more"]);
  }

  #[test]
  fn falls_back_to_period_then_space() {
    let chunks = split_message("One two. Three four five", 14);
    assert_eq!(chunks, vec!["One two.", "Three four ", "five"]);

    // 没有句号时在最后一个空格处切
    let chunks = split_message("alpha beta gamma", 12);
    assert_eq!(chunks, vec!["alpha beta ", "gamma"]);
  }

  #[test]
  fn period_inside_word_is_not_a_boundary() {
    let chunks = split_message("v1.2 build ok", 8);
    assert_eq!(chunks, vec!["v1.2 ", "build ok"]);
  }

  #[test]
  fn period_at_window_end_counts_when_followed_by_space() {
    let chunks = split_message("abc. defgh", 4);
    assert_eq!(chunks, vec!["abc.", "defg", "h"]);
  }

  #[test]
  fn hard_cut_without_separators() {
    let chunks = split_message("abcdefghij", 4);
    assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
  }

  #[test]
  fn zero_limit_is_treated_as_one() {
    assert_eq!(split_message("abc", 0), vec!["a", "b", "c"]);
  }

  #[test]
  fn counts_chars_not_bytes() {
    let text = "жжжжжж";
    let chunks = split_message(text, 4);
    assert_eq!(chunks, vec!["жжжж", "жж"]);
  }

  /// 逐段对照原文：每段都是剩余文本的前缀，段与段之间只跳过空白
  fn assert_reconstructs(text: &str, chunks: &[String], max_len: usize) {
    let mut rest = text;
    for (i, chunk) in chunks.iter().enumerate() {
      assert!(chunk.chars().count() <= max_len.max(1), "chunk {i} too long");
      assert!(rest.starts_with(chunk.as_str()), "chunk {i} is not a prefix");
      rest = rest[chunk.len()..].trim_start();
    }
    assert!(rest.is_empty(), "text left over: {rest:?}");
  }

  #[test]
  fn chunks_are_prefixes_of_the_remaining_text() {
    let texts = [
      "📊 DETAILED REPORT\n\n• Total objects: 3\nSome words here. And more words follow after that. "
        .repeat(40),
      "no-separators-at-all-".repeat(30),
      "Ends with a period. Then   several   spaces.\n\n\nand blank lines ".repeat(12),
      "жж. жжж жжжж\nж ".repeat(25),
    ];
    for text in &texts {
      for max_len in [0, 1, 2, 3, 7, 13, 50, 200, 4096] {
        let chunks = split_message(text, max_len);
        assert!(chunks.iter().all(|c| !c.is_empty()));
        assert_reconstructs(text, &chunks, max_len);
      }
    }
  }
}
