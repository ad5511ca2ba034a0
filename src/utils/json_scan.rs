// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 通用JSON关键字扫描
//!
//! 对任意嵌套的JSON值做树遍历，收集键名命中关键字集合的
//! `(路径, 值)` 匹配对。与具体提取策略解耦，策略只消费匹配结果。

use serde_json::Value;

/// 一次键名命中
#[derive(Debug, Clone)]
pub struct KeyMatch<'a> {
    /// 点分路径，数组下标记作 `[i]`
    pub path: String,
    /// 命中的键名
    pub key: String,
    /// 对应的值
    pub value: &'a Value,
}

/// 扫描JSON树，返回键名包含任一关键字（不区分大小写）的所有匹配
pub fn scan_keys<'a>(root: &'a Value, keywords: &[String]) -> Vec<KeyMatch<'a>> {
    let mut matches = Vec::new();
    walk(root, String::new(), keywords, &mut matches);
    matches
}

fn walk<'a>(node: &'a Value, path: String, keywords: &[String], out: &mut Vec<KeyMatch<'a>>) {
    match node {
        Value::Object(map) => {
            for (key, value) in map {
                let key_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                let key_lower = key.to_lowercase();
                if keywords.iter().any(|kw| key_lower.contains(kw.as_str())) {
                    out.push(KeyMatch {
                        path: key_path.clone(),
                        key: key.clone(),
                        value,
                    });
                }
                walk(value, key_path, keywords, out);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, format!("{}[{}]", path, i), keywords, out);
            }
        }
        _ => {}
    }
}
