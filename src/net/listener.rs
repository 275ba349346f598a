//! TCP listener binding.
//!
//! # Responsibilities
//! - Parse the configured bind address
//! - Bind, reporting "address in use" as its own error
//!
//! # Design Decisions
//! - Binding happens before any banner or serve loop, so a bind failure
//!   is returned to the caller and nothing is served

use std::io::ErrorKind;
use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("invalid bind address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("address {0} is already in use")]
    AddrInUse(SocketAddr),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// Bind to the configured address.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let addr: SocketAddr =
        config
            .bind_address
            .parse()
            .map_err(|source| ListenerError::InvalidAddress {
                address: config.bind_address.clone(),
                source,
            })?;

    let listener = TcpListener::bind(addr).await.map_err(|source| {
        if source.kind() == ErrorKind::AddrInUse {
            ListenerError::AddrInUse(addr)
        } else {
            ListenerError::Bind {
                address: addr,
                source,
            }
        }
    })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ListenerError::Bind {
            address: addr,
            source,
        })?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}
