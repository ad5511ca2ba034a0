// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 数据库模块
///
/// 提供 SQLite 连接池创建与表结构初始化
pub mod connection;

pub use connection::{create_pool, ensure_schema};
