// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sha2::{Digest, Sha256};
use url::{ParseError, Url};

/// 将可能为相对路径的URL转换为绝对路径URL
pub fn resolve_url(base_url: &Url, path: &str) -> Result<Url, ParseError> {
    base_url.join(path)
}

/// 提取 scheme + host 作为站点根地址
pub fn site_root(url: &Url) -> String {
    format!(
        "{}://{}",
        url.scheme(),
        url.host_str().unwrap_or_default()
    )
}

/// 规范化URL为身份识别用的标准形式
///
/// 规则: 主机名小写、去掉默认端口、移除跟踪查询参数（`utm_` 前缀
/// 以及显式清单中的参数名）、丢弃片段标识符。非跟踪查询参数保留，
/// 顺序不变。两条规范形式相同的URL指向同一逻辑实体。
pub fn canonicalize(raw: &str, strip_params: &[String]) -> Result<String, ParseError> {
    let mut url = Url::parse(raw)?;

    // Url::parse already lowercases the host and drops default ports
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| {
            let key = k.to_lowercase();
            !key.starts_with("utm_") && !strip_params.iter().any(|p| p.eq_ignore_ascii_case(&key))
        })
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        let query = kept
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{}={}", k, v)
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }

    Ok(url.to_string())
}

/// 根据规范化URL计算确定性身份键
///
/// 键值为规范形式的 SHA-256 十六进制摘要
pub fn identity_key(raw: &str, strip_params: &[String]) -> Result<String, ParseError> {
    let canonical = canonicalize(raw, strip_params)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
