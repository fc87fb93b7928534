use crate::error::DiagError;
use crate::types::Target;
use async_trait::async_trait;
use std::net::IpAddr;
use tokio::net::lookup_host;
use tracing::{debug, warn};

/// Hostname to address lookup.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<IpAddr, DiagError>;
}

/// Resolver backed by the operating system (getaddrinfo via tokio).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, DiagError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        // lookup_host needs a port; it is discarded.
        let addrs: Vec<IpAddr> = lookup_host((host, 0))
            .await
            .map_err(|e| DiagError::Resolution {
                host: host.to_string(),
                reason: e.to_string(),
            })?
            .map(|sa| sa.ip())
            .collect();

        pick_address(&addrs).ok_or_else(|| DiagError::Resolution {
            host: host.to_string(),
            reason: "no addresses returned".to_string(),
        })
    }
}

/// Prefer IPv4, fall back to whatever came first.
fn pick_address(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}

/// Resolve `host` into a `Target`. A failed lookup yields `address: None`.
pub async fn resolve_target<R: Resolver + ?Sized>(resolver: &R, host: &str) -> Target {
    match resolver.resolve(host).await {
        Ok(ip) => {
            debug!(host, %ip, "resolved");
            Target::new(host, Some(ip))
        }
        Err(e) => {
            warn!(host, error = %e, "resolution failed");
            Target::new(host, None)
        }
    }
}
