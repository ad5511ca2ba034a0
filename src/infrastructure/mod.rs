// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层
///
/// 提供数据库连接、仓库实现与可观测性等外部依赖的适配
pub mod database;
pub mod observability;
pub mod repositories;
