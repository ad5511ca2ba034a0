// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 包含核心业务实体、服务和仓库接口
pub mod domain;

/// 引擎模块
///
/// 实现各种网页抓取引擎与路由
pub mod engines;

/// 提取模块
///
/// 实现提取策略链与各提取策略
pub mod extraction;

/// 基础设施模块
///
/// 提供外部服务集成，如数据库、可观测性等
pub mod infrastructure;

/// 管道模块
///
/// 实现批次编排与候选来源
pub mod pipeline;

/// 工具模块
///
/// 提供通用的工具函数和辅助功能
pub mod utils;
