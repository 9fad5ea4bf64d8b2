//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity > 0, codec level supported)
//! - Check addresses parse and do not collide
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RelayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::RelayConfig;

/// Smallest pipe buffer that still lets the encoder emit a full block header.
pub const MIN_PIPE_BUFFER_BYTES: usize = 1024;

/// Largest admission queue. Every waiting stream pins a pipe buffer.
pub const MAX_QUEUE_CAPACITY: usize = 65_536;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("relay.queue_capacity must be at least 1")]
    ZeroCapacity,

    #[error("relay.queue_capacity must be at most 65536, got {0}")]
    CapacityTooLarge(usize),

    #[error("relay.pipe_buffer_bytes must be at least 1024, got {0}")]
    PipeBufferTooSmall(usize),

    #[error("relay.unclaimed_timeout_secs must be greater than 0 when set")]
    ZeroUnclaimedTimeout,

    #[error("codec.level {level} is outside the supported range {min}..={max}")]
    CodecLevel { level: i32, min: i32, max: i32 },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("raw.bind_address collides with listener.bind_address ({0})")]
    AddressCollision(String),

    #[error("raw.max_connections must be at least 1")]
    ZeroRawConnections,
}

/// Validate a parsed configuration, collecting every error found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.relay.queue_capacity == 0 {
        errors.push(ValidationError::ZeroCapacity);
    } else if config.relay.queue_capacity > MAX_QUEUE_CAPACITY {
        errors.push(ValidationError::CapacityTooLarge(
            config.relay.queue_capacity,
        ));
    }
    if config.relay.pipe_buffer_bytes < MIN_PIPE_BUFFER_BYTES {
        errors.push(ValidationError::PipeBufferTooSmall(
            config.relay.pipe_buffer_bytes,
        ));
    }
    if config.relay.unclaimed_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroUnclaimedTimeout);
    }

    let levels = zstd::compression_level_range();
    if !levels.contains(&config.codec.level) {
        errors.push(ValidationError::CodecLevel {
            level: config.codec.level,
            min: *levels.start(),
            max: *levels.end(),
        });
    }

    let http = check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.raw.enabled {
        let raw = check_address("raw.bind_address", &config.raw.bind_address, &mut errors);
        if let (Some(http), Some(raw)) = (http, raw) {
            if http == raw {
                errors.push(ValidationError::AddressCollision(raw.to_string()));
            }
        }
        if config.raw.max_connections == 0 {
            errors.push(ValidationError::ZeroRawConnections);
        }
    }
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(
    field: &'static str,
    value: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<SocketAddr> {
    match value.parse() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}
