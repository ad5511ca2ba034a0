// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 初始化指标系统
///
/// 配置 Prometheus 导出器并注册应用所需的各类监控指标。
/// 导出器安装失败时降级为告警，不中止批次运行。
pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        return;
    }

    let addr: SocketAddr = match settings.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!(
                listen_addr = %settings.listen_addr,
                "invalid metrics listen address, metrics disabled: {}", e
            );
            return;
        }
    };

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("failed to install Prometheus recorder, metrics disabled: {}", e);
        return;
    }

    // Register metrics
    describe_counter!(
        "harvest_items_total",
        "Total number of candidate items submitted to the pipeline"
    );
    describe_counter!(
        "harvest_items_rejected_total",
        "Total number of candidate items rejected by the scorer"
    );
    describe_counter!(
        "harvest_items_persisted_total",
        "Total number of records persisted"
    );
    describe_counter!(
        "harvest_items_skipped_total",
        "Total number of records skipped as duplicates"
    );
    describe_counter!(
        "harvest_items_failed_total",
        "Total number of items that failed terminally"
    );
    describe_counter!(
        "harvest_strategy_attempts_total",
        "Total number of extraction strategy attempts"
    );
    describe_counter!(
        "harvest_strategy_success_total",
        "Total number of extraction strategy complete results"
    );
    describe_histogram!(
        "harvest_item_duration_seconds",
        "Wall time spent processing a single item"
    );

    info!(listen_addr = %settings.listen_addr, "Prometheus exporter started");
}
