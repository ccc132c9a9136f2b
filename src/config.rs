//! Endpoint configuration from the host agent's parsed config tree

use crate::rewrite::RewriteRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

/// One node of the configuration tree the host agent hands over.
///
/// The grammar itself is the host's concern; this crate only consumes the
/// parsed key/values/children shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigNode {
    pub key: String,
    pub values: Vec<String>,
    pub children: Vec<ConfigNode>,
}

impl ConfigNode {
    pub fn new(key: impl Into<String>, values: &[&str]) -> Self {
        Self {
            key: key.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ConfigNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Configuration for one push destination
#[derive(Clone, Debug)]
pub struct EndpointConfig {
    pub name: String,
    pub url: String,
    pub token: String,
    pub flush_interval: Duration,
    pub flush_retry_interval: Duration,
    pub buffer_size: usize,
    pub http_timeout: Duration,
    pub default_labels: BTreeMap<String, String>,
    pub rewrite_rules: Vec<RewriteRule>,
    pub rewrite_limit: usize,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            url: String::new(),
            token: String::new(),
            flush_interval: Duration::from_secs(30),
            flush_retry_interval: Duration::from_secs(10),
            buffer_size: 65536,
            http_timeout: Duration::from_secs(80),
            default_labels: BTreeMap::new(),
            rewrite_rules: Vec::new(),
            rewrite_limit: 10,
        }
    }
}

impl EndpointConfig {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            token: token.into(),
            ..Self::default()
        }
    }

    /// Build from one `Endpoint` config block. Returns `None` (with a
    /// warning) if the block is missing its name, URL or token.
    pub fn from_node(node: &ConfigNode) -> Option<Self> {
        let mut endpoint = EndpointConfig::default();

        if node.values.len() == 1 {
            endpoint.name = node.values[0].clone();
        }

        for child in &node.children {
            match child.key.as_str() {
                "URL" => {
                    if let Some(value) = child.values.first() {
                        endpoint.url = value.clone();
                    }
                }
                "Token" => {
                    if let Some(value) = child.values.first() {
                        endpoint.token = value.clone();
                    }
                }
                "FlushInterval" => {
                    endpoint.flush_interval = parse_seconds(child, endpoint.flush_interval);
                }
                "FlushRetryInterval" => {
                    endpoint.flush_retry_interval =
                        parse_seconds(child, endpoint.flush_retry_interval);
                }
                "Timeout" => {
                    endpoint.http_timeout = parse_seconds(child, endpoint.http_timeout);
                }
                "BufferSize" => {
                    endpoint.buffer_size = parse_count(child, endpoint.buffer_size);
                }
                "RewriteLimit" => {
                    endpoint.rewrite_limit = parse_count(child, endpoint.rewrite_limit);
                }
                "DefaultLabel" => {
                    if child.values.len() == 2 {
                        endpoint
                            .default_labels
                            .insert(child.values[0].clone(), child.values[1].clone());
                    } else {
                        warn!(values = ?child.values, "DefaultLabel expects a key and a value");
                    }
                }
                "RewriteRule" => {
                    if let Some(rule) = RewriteRule::from_values(&child.values) {
                        endpoint.rewrite_rules.push(rule);
                    }
                }
                other => {
                    warn!(key = other, "Unknown config key for Endpoint");
                }
            }
        }

        if endpoint.name.is_empty() || endpoint.url.is_empty() || endpoint.token.is_empty() {
            warn!("Missing name, URL or Token config for Endpoint");
            return None;
        }

        Some(endpoint)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.name.is_empty() {
            return Err("endpoint name cannot be empty".to_string());
        }

        if self.url.is_empty() {
            return Err("endpoint URL cannot be empty".to_string());
        }

        if self.token.is_empty() {
            return Err("endpoint token cannot be empty".to_string());
        }

        if self.buffer_size == 0 {
            return Err("buffer_size must be greater than 0".to_string());
        }

        if self.flush_interval.is_zero() || self.flush_retry_interval.is_zero() {
            return Err("flush intervals must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Parse the endpoint blocks out of the plugin's configuration root.
///
/// A legacy configuration without explicit `Endpoint` blocks is normalized
/// into a single endpoint named `default`. Duplicate endpoint names keep the
/// first occurrence; later duplicates are dropped with a warning.
pub fn endpoints_from_config(root: &ConfigNode) -> Vec<EndpointConfig> {
    let legacy;
    let node = if root.children.iter().any(|n| n.key == "Endpoint") {
        root
    } else {
        legacy = ConfigNode {
            key: root.key.clone(),
            values: root.values.clone(),
            children: vec![ConfigNode {
                key: "Endpoint".to_string(),
                values: vec!["default".to_string()],
                children: root.children.clone(),
            }],
        };
        &legacy
    };

    let mut endpoints: Vec<EndpointConfig> = Vec::new();
    for child in &node.children {
        if child.key != "Endpoint" {
            warn!(key = %child.key, "Unknown config key");
            continue;
        }

        if let Some(endpoint) = EndpointConfig::from_node(child) {
            if endpoints.iter().any(|e| e.name == endpoint.name) {
                warn!(endpoint = %endpoint.name, "Duplicate endpoint");
            } else {
                endpoints.push(endpoint);
            }
        }
    }

    if endpoints.is_empty() {
        warn!("No valid endpoints found");
    }

    endpoints
}

fn parse_seconds(node: &ConfigNode, default: Duration) -> Duration {
    match node.values.first().and_then(|v| v.parse::<f64>().ok()) {
        Some(seconds) if seconds > 0.0 && seconds.is_finite() => Duration::from_secs_f64(seconds),
        _ => {
            warn!(key = %node.key, values = ?node.values, "Invalid duration value, keeping default");
            default
        }
    }
}

fn parse_count(node: &ConfigNode, default: usize) -> usize {
    match node.values.first().and_then(|v| v.parse::<usize>().ok()) {
        Some(count) => count,
        None => {
            warn!(key = %node.key, values = ?node.values, "Invalid numeric value, keeping default");
            default
        }
    }
}
