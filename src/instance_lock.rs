//! Single-instance guard.
//!
//! Two processes polling the same bot token would duplicate admin
//! notifications and race on sessions, so startup binds a fixed local port
//! and gives up if another instance already holds it.

use std::net::{Ipv4Addr, TcpListener};

use anyhow::{Context, Result};
use tracing::info;

/// Held for the lifetime of the process; dropping it releases the port
#[derive(Debug)]
pub struct InstanceLock {
    _listener: TcpListener,
    port: u16,
}

impl InstanceLock {
    pub fn acquire(port: u16) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port)).with_context(|| {
            format!("Another instance is already running (port {port} is taken)")
        })?;
        let port = listener.local_addr().map(|a| a.port()).unwrap_or(port);
        info!(port, "Instance lock acquired");
        Ok(Self {
            _listener: listener,
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
