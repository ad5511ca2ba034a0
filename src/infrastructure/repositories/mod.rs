// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
pub mod sqlite_record_repo;

pub use sqlite_record_repo::SqliteRecordRepository;
