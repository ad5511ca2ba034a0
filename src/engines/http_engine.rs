// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::engines::traits::{EngineError, FetchEngine, FetchRequest, RenderedPage, WaitStrategy};
use crate::engines::validators;
use async_trait::async_trait;
use std::time::Instant;

/// HTTP 引擎
///
/// 基于reqwest的静态页面抓取引擎。不执行JavaScript，
/// 不支持嗅探窗口，但对服务端渲染页面最快
pub struct HttpEngine;

#[async_trait]
impl FetchEngine for HttpEngine {
    /// 执行HTTP抓取
    ///
    /// # 参数
    ///
    /// * `request` - 抓取请求
    ///
    /// # 返回值
    ///
    /// * `Ok(RenderedPage)` - 抓取到的页面
    /// * `Err(EngineError)` - 抓取过程中出现的错误
    async fn fetch(&self, request: &FetchRequest) -> Result<RenderedPage, EngineError> {
        // SSRF protection
        validators::validate_url(&request.url)
            .await
            .map_err(|e| EngineError::Other(format!("SSRF protection: {}", e)))?;

        // Each request gets a fresh client for cookie isolation
        let client = reqwest::Client::builder()
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
            )
            .timeout(request.timeout)
            .cookie_store(true)
            .build()?;

        let start = Instant::now();
        let response = client.get(&request.url).send().await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let html = response.text().await?;

        // A fixed-delay wait still applies to give upstream caches a beat;
        // element-text waits require a JS runtime and are not honored here.
        if let WaitStrategy::FixedMs(ms) = request.wait {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
        }

        Ok(RenderedPage {
            final_url,
            html,
            status,
            observed_responses: Vec::new(),
            elapsed: start.elapsed(),
        })
    }

    /// 计算对请求的支持分数
    ///
    /// # 返回值
    ///
    /// 支持分数（0-100）；需要JS渲染或嗅探的请求返回0
    fn support_score(&self, request: &FetchRequest) -> u8 {
        if request.needs_js || request.sniff || !request.actions.is_empty() {
            return 0; // Not supported
        }
        if matches!(request.wait, WaitStrategy::ElementTextExceeds { .. }) {
            return 0;
        }
        100 // Highest priority (fastest)
    }

    /// 获取引擎名称
    fn name(&self) -> &'static str {
        "http"
    }
}
