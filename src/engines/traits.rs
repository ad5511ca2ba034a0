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

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 请求失败
    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    /// 浏览器协议错误
    #[error("Browser protocol error: {0}")]
    Browser(String),
    /// 所有引擎都失败
    #[error("All engines failed")]
    AllEnginesFailed,
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

impl EngineError {
    /// 判断错误是否可重试
    ///
    /// # 返回值
    ///
    /// 如果错误是可重试的则返回true，否则返回false
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::RequestFailed(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            EngineError::Browser(_) => true, // CDP session hiccups usually recover on retry
            EngineError::Timeout => true,
            EngineError::Other(_) => false,
            _ => false,
        }
    }
}

/// 等待策略
///
/// 控制引擎在返回内容前等待动态渲染的方式
#[derive(Debug, Clone, PartialEq)]
pub enum WaitStrategy {
    /// 不等待
    None,
    /// 固定延迟
    FixedMs(u64),
    /// 等待指定元素的文本长度超过阈值
    ElementTextExceeds { selector: String, min_chars: usize },
}

/// 页面动作
///
/// 导航完成后、取回内容前按序执行
#[derive(Debug, Clone)]
pub enum PageAction {
    /// 点击匹配选择器的首个元素
    Click(String),
    /// 固定停顿
    WaitMs(u64),
}

/// 抓取请求
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 目标URL
    pub url: String,
    /// 等待策略
    pub wait: WaitStrategy,
    /// 超时时间
    pub timeout: Duration,
    /// 是否需要JavaScript渲染
    pub needs_js: bool,
    /// 是否开启被动响应嗅探窗口
    pub sniff: bool,
    /// 嗅探窗口时长（毫秒）
    pub sniff_window_ms: u64,
    /// 导航后执行的页面动作
    pub actions: Vec<PageAction>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            wait: WaitStrategy::None,
            timeout: Duration::from_secs(30),
            needs_js: false,
            sniff: false,
            sniff_window_ms: 3000,
            actions: Vec::new(),
        }
    }

    pub fn rendered(url: impl Into<String>) -> Self {
        Self {
            needs_js: true,
            ..Self::new(url)
        }
    }
}

/// 被动嗅探到的网络响应
///
/// 仅保留观察窗口内到达且解析为 JSON 的响应；窗口关闭后到达的响应被丢弃
#[derive(Debug, Clone)]
pub struct ObservedResponse {
    pub url: String,
    pub content_type: String,
    pub body_json: serde_json::Value,
}

/// 渲染后的页面
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// 重定向后的最终URL
    pub final_url: String,
    /// 页面HTML
    pub html: String,
    /// HTTP状态码
    pub status: u16,
    /// 嗅探窗口内收集的响应
    pub observed_responses: Vec<ObservedResponse>,
    /// 抓取耗时
    pub elapsed: Duration,
}

/// 抓取引擎特质
#[async_trait]
pub trait FetchEngine: Send + Sync {
    /// 执行抓取
    async fn fetch(&self, request: &FetchRequest) -> Result<RenderedPage, EngineError>;

    /// 计算对请求的支持分数（0-100）
    fn support_score(&self, request: &FetchRequest) -> u8;

    /// 引擎名称
    fn name(&self) -> &'static str;
}
