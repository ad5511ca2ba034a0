// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 文本清理工具
//!
//! 提供提取内容的清理功能：空白折叠、HTML实体解码、
//! 按字符边界的确定性截断

/// 折叠连续空白并去除首尾空白
pub fn clean_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 解码HTML实体并清理空白
pub fn clean_fragment(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);
    clean_whitespace(&decoded)
}

/// 在指定字符数处确定性截断
///
/// 截断点按 `char` 计数，绝不会落在多字节编码单元中间。
/// 未超过上限的文本原样返回。
pub fn truncate_at(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

/// 非空且修剪后长度达到下限
pub fn meets_min_length(text: &str, min_len: usize) -> bool {
    text.trim().len() >= min_len
}
