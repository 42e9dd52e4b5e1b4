//! Server lifecycle management.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tiny_http::Server;
use tokio::runtime::Runtime;

use crate::core::register_server;
use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// How long in-flight builds get after the request loop returns.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Bind the HTTP server and hand it to the Ctrl+C handler.
pub fn bind_server(interface: IpAddr, port: u16) -> Result<(Arc<Server>, SocketAddr)> {
    let (server, addr) = bind_with_retry(interface, port)?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));
    Ok((server, addr))
}

/// Runtime hosting the build actors.
///
/// Request threads block on its handle, so it must stay multi-threaded.
pub fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("devpack-build")
        .enable_all()
        .build()
        .map_err(|e| anyhow!("failed to create tokio runtime: {e}"))
}

/// Stop the runtime without waiting forever on a hung compile.
pub fn shutdown_runtime(runtime: Runtime) {
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
}
