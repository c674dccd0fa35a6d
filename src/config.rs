//! Process configuration read from environment variables.
//!
//! | variable | default | meaning |
//! |---|---|---|
//! | `CLINIC_HTTP_PORT` / `PORT` | 8080 | HTTP listen port (`CLINIC_HTTP_PORT` wins) |
//! | `CLINIC_BIND` | 0.0.0.0 | listen address |
//! | `CLINIC_SESSION_TTL_SECS` | 3600 | session lifetime and cookie Max-Age |
//! | `CLINIC_SWEEP_INTERVAL_SECS` | 60 | expired-session sweep period, 0 disables |

use std::net::{IpAddr, Ipv4Addr};

use anyhow::{anyhow, Context, Result};
use chrono::Duration;

use crate::identity::DEFAULT_TTL_SECS;

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    pub session_ttl: Duration,
    pub sweep_interval: Option<std::time::Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            session_ttl: Duration::seconds(DEFAULT_TTL_SECS),
            sweep_interval: Some(std::time::Duration::from_secs(60)),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut cfg = Self::default();

        if let Some(port) = get("CLINIC_HTTP_PORT").or_else(|| get("PORT")) {
            cfg.port = port.parse().with_context(|| format!("invalid HTTP port '{}'", port))?;
        }
        if let Some(bind) = get("CLINIC_BIND") {
            cfg.bind = bind.parse().with_context(|| format!("invalid CLINIC_BIND address '{}'", bind))?;
        }
        if let Some(ttl) = get("CLINIC_SESSION_TTL_SECS") {
            let secs: i64 = ttl.parse().with_context(|| format!("invalid CLINIC_SESSION_TTL_SECS '{}'", ttl))?;
            if secs <= 0 || secs > MAX_SESSION_TTL_SECS {
                return Err(anyhow!(
                    "CLINIC_SESSION_TTL_SECS must be between 1 and {}, got {}",
                    MAX_SESSION_TTL_SECS, secs
                ));
            }
            cfg.session_ttl = Duration::try_seconds(secs)
                .ok_or_else(|| anyhow!("CLINIC_SESSION_TTL_SECS out of range: {}", secs))?;
        }
        if let Some(every) = get("CLINIC_SWEEP_INTERVAL_SECS") {
            let secs: u64 = every.parse().with_context(|| format!("invalid CLINIC_SWEEP_INTERVAL_SECS '{}'", every))?;
            cfg.sweep_interval = (secs > 0).then(|| std::time::Duration::from_secs(secs));
        }
        Ok(cfg)
    }
}
