//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the compression relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP listener for the queue-paired variant.
    pub listener: ListenerConfig,

    /// Raw TCP listener for the self-paired variant.
    pub raw: RawListenerConfig,

    /// Admission queue and stream handle sizing.
    pub relay: QueueConfig,

    /// Encoder settings.
    pub codec: CodecConfig,

    /// Shutdown behaviour.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8002").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8002".to_string(),
        }
    }
}

/// Raw socket listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RawListenerConfig {
    /// Serve the raw-socket compressor at all.
    pub enabled: bool,

    /// Bind address (e.g., "0.0.0.0:8001").
    pub bind_address: String,

    /// Maximum concurrent raw connections (backpressure).
    pub max_connections: usize,
}

impl Default for RawListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "0.0.0.0:8001".to_string(),
            max_connections: 1024,
        }
    }
}

/// Admission queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of admitted streams waiting for a consumer.
    pub queue_capacity: usize,

    /// In-memory buffer between an encoder and its consumer, in bytes.
    pub pipe_buffer_bytes: usize,

    /// Discard admitted streams nobody claimed after this many seconds.
    /// Unset means streams wait indefinitely.
    pub unclaimed_timeout_secs: Option<u64>,
}

impl QueueConfig {
    pub fn unclaimed_timeout(&self) -> Option<Duration> {
        self.unclaimed_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            pipe_buffer_bytes: 64 * 1024,
            unclaimed_timeout_secs: None,
        }
    }
}

/// Encoder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// zstd compression level.
    pub level: i32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self { level: 3 }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Seconds in-flight transfers get to finish after a shutdown signal.
    pub drain_timeout_secs: u64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
