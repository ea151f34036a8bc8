// xats-common/src/validation/cache.rs
use serde_json::Value;

use super::structural::Checker;
use super::ValidationReport;
use crate::model::cache_policy::{CacheConfig, CacheProvider};

const MIN_REDIS_CLUSTER_NODES: usize = 3;

/// Validates a raw cache policy document.
pub fn validate_cache(config: &Value) -> ValidationReport {
    let structural = check_structure(config);
    if !structural.is_empty() {
        return ValidationReport::from_errors(structural);
    }
    match serde_json::from_value::<CacheConfig>(config.clone()) {
        Ok(parsed) => validate_cache_config(&parsed),
        Err(e) => ValidationReport::from_errors(vec![format!("cache config: {e}")]),
    }
}

pub fn validate_cache_config(config: &CacheConfig) -> ValidationReport {
    let mut report = ValidationReport::ok();

    if let Some(memory) = config.memory.as_ref().filter(|m| m.enabled) {
        fraction(&mut report, "memory.maxMemoryFraction", memory.max_memory_fraction);
        if memory.max_entries == Some(0) {
            report.warn("memory.maxEntries is 0; the memory cache will never hold anything");
        }
    }

    if let Some(disk) = config.disk.as_ref().filter(|d| d.enabled) {
        if disk.path.as_deref().is_none_or(|p| p.trim().is_empty()) {
            report.error("disk cache is enabled but disk.path is not set");
        }
    }

    if let Some(dist) = config.distributed.as_ref().filter(|d| d.enabled) {
        if dist.provider.is_none() {
            report.error("distributed cache is enabled but distributed.provider is not set");
        }
        if dist.host.as_deref().is_none_or(|h| h.trim().is_empty()) {
            report.error("distributed cache is enabled but distributed.host is not set");
        }
        if dist.provider == Some(CacheProvider::Redis)
            && !dist.nodes.is_empty()
            && dist.nodes.len() < MIN_REDIS_CLUSTER_NODES
        {
            report.warn(format!(
                "Redis cluster has {} nodes; at least {MIN_REDIS_CLUSTER_NODES} are recommended",
                dist.nodes.len()
            ));
        }
    }

    if let Some(mon) = config.monitoring.as_ref().filter(|m| m.enabled) {
        fraction(&mut report, "monitoring.minHitRate", mon.min_hit_rate);
        fraction(&mut report, "monitoring.maxMemoryUsage", mon.max_memory_usage);
        if let Some(ms) = mon.max_response_time_ms {
            if ms <= 0.0 {
                report.error(format!(
                    "monitoring.maxResponseTimeMs must be positive, got {ms}"
                ));
            }
        }
    }

    report
}

fn fraction(report: &mut ValidationReport, name: &str, value: Option<f64>) {
    if let Some(v) = value {
        if !(0.0..=1.0).contains(&v) {
            report.error(format!("{name} must be within [0, 1], got {v}"));
        }
    }
}

fn check_structure(config: &Value) -> Vec<String> {
    let mut c = Checker::default();
    let Some(root) = c.object(config, "$") else {
        return c.errors;
    };
    if let Some(memory) = c.nested(root, "memory", "$", false) {
        let at = "$.memory";
        c.boolean(memory, "enabled", at, true);
        c.unsigned(memory, "maxEntries", at, false);
        c.unsigned(memory, "ttlSeconds", at, false);
        c.number(memory, "maxMemoryFraction", at, false);
    }
    if let Some(disk) = c.nested(root, "disk", "$", false) {
        let at = "$.disk";
        c.boolean(disk, "enabled", at, true);
        c.string(disk, "path", at, false);
        c.unsigned(disk, "maxSizeBytes", at, false);
        c.unsigned(disk, "ttlSeconds", at, false);
    }
    if let Some(dist) = c.nested(root, "distributed", "$", false) {
        let at = "$.distributed";
        c.boolean(dist, "enabled", at, true);
        c.one_of(dist, "provider", at, false, &CacheProvider::ALL);
        c.string(dist, "host", at, false);
        c.unsigned(dist, "port", at, false);
        if let Some(port) = dist.get("port").and_then(Value::as_u64) {
            if port > u64::from(u16::MAX) {
                c.errors.push(format!("{at}.port must be at most {}, got {port}", u16::MAX));
            }
        }
        c.string_array(dist, "nodes", at, false);
    }
    if let Some(mon) = c.nested(root, "monitoring", "$", false) {
        let at = "$.monitoring";
        c.boolean(mon, "enabled", at, true);
        c.number(mon, "minHitRate", at, false);
        c.number(mon, "maxMemoryUsage", at, false);
        c.number(mon, "maxResponseTimeMs", at, false);
    }
    c.errors
}
