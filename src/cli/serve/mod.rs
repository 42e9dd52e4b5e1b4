//! Development server with live reload support.
//!
//! ```text
//! request --> HotReloader::run (gate) --finished--> gate response
//!                  |
//!                  +--> hmr-client.js | <dist> file | page shell
//! ```

mod lifecycle;
mod path;
mod response;

use std::sync::Arc;

use anyhow::Result;
use tiny_http::{Request, Server};

use crate::actor::Coordinator;
use crate::compiler::ModuleCompiler;
use crate::config::{DevConfig, cfg};
use crate::core::{bundle_path, is_api_route, is_shutdown};
use crate::embed::serve::{HMR_CLIENT_JS, HmrClientVars, SHELL_HTML, ShellVars};
use crate::entry::resolve_page;
use crate::gate::GateRequest;
use crate::hmr::start_hmr_server;
use crate::reloader::HotReloader;
use crate::{debug, log};

/// Request handler threads. Each may block on an on-demand build.
const REQUEST_THREADS: usize = 4;

/// Everything a request handler needs.
struct ServeContext {
    config: Arc<DevConfig>,
    reloader: HotReloader,
    hmr_port: u16,
}

/// Run the dev server until Ctrl+C.
pub fn serve() -> Result<()> {
    let config = cfg();
    let runtime = lifecycle::build_runtime()?;
    let system = {
        let _guard = runtime.enter();
        Coordinator::new(Arc::clone(&config), Arc::new(ModuleCompiler))
            .with_watch(config.serve.watch)
            .start()?
    };
    let reloader = HotReloader::new(&config, &system, runtime.handle().clone());

    let hmr_port = start_hmr_server(config.serve.interface, config.hmr_port(), reloader.upgrader())?;
    debug!("hmr"; "ws://{}:{}{}", config.serve.interface, hmr_port, config.hmr.path);

    let (server, addr) = lifecycle::bind_server(config.serve.interface, config.serve.port)?;
    log!("serve"; "http://{}", addr);

    let ctx = Arc::new(ServeContext {
        config,
        reloader,
        hmr_port,
    });
    run_request_loop(&server, &ctx)?;

    runtime.block_on(system.shutdown());
    lifecycle::shutdown_runtime(runtime);
    Ok(())
}

fn run_request_loop(server: &Server, ctx: &Arc<ServeContext>) -> Result<()> {
    // Use thread pool to handle requests concurrently
    // This prevents on-demand compilation from blocking other requests
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .thread_name(|i| format!("devpack-http-{i}"))
        .build()?;

    for request in server.incoming_requests() {
        let ctx = Arc::clone(ctx);
        pool.spawn(move || {
            if let Err(e) = ctx.handle_request(request) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

impl ServeContext {
    /// Handle a single HTTP request
    fn handle_request(&self, request: Request) -> Result<()> {
        // Early exit if shutdown requested
        if is_shutdown() {
            return response::respond_unavailable(request);
        }

        let gate_request = gate_request(&request);
        let result = self.reloader.run(&gate_request);
        if result.finished {
            return match result.response {
                Some(response) => response::respond_gate(request, response),
                None => response::respond_not_found(request, &result.headers),
            };
        }

        let path = gate_request.path();
        let build_id = &self.config.build.build_id;

        if path == hmr_client_url(build_id) {
            let body = HMR_CLIENT_JS.render(&HmrClientVars {
                hmr_path: self.config.hmr.path.clone(),
                hmr_port: self.hmr_port,
                ping_interval_ms: self.config.hmr.ping_interval,
            });
            return response::respond_javascript(request, body);
        }

        if let Some(rest) = path.strip_prefix("/_next/") {
            return match path::resolve_path(rest, &self.config.build.dist) {
                Some(file) => response::respond_file(request, &file, &result.headers),
                None => response::respond_not_found(request, &result.headers),
            };
        }

        match page_route(path) {
            Some(route) => self.respond_page(request, &route),
            None => response::respond_not_found(request, &result.headers),
        }
    }

    /// Serve the shell for a page; its bundle request goes through the gate.
    fn respond_page(&self, request: Request, route: &str) -> Result<()> {
        let build = &self.config.build;
        if resolve_page(&build.pages, route, &build.extensions).is_ok() {
            let body = render_shell(route, "", page_scripts(&build.build_id, route));
            return response::respond_html(request, 200, body);
        }

        match self.reloader.fallback_blocking() {
            Ok(_) => {
                let body = render_shell(
                    route,
                    "404 - This page could not be found",
                    fallback_scripts(&build.build_id),
                );
                response::respond_html(request, 404, body)
            }
            Err(e) => {
                debug!("serve"; "fallback build failed: {}", e);
                response::respond_not_found(request, &[])
            }
        }
    }
}

fn gate_request(request: &Request) -> GateRequest {
    let headers = request
        .headers()
        .iter()
        .map(|h| (h.field.as_str().to_string(), h.value.to_string()));
    GateRequest::new(request.method().as_str(), request.url()).with_headers(headers)
}

fn hmr_client_url(build_id: &str) -> String {
    format!("/_next/static/{build_id}/hmr-client.js")
}

/// Route of a page request, `None` for API routes and internal paths.
fn page_route(path: &str) -> Option<String> {
    let decoded = percent_encoding::percent_decode_str(path).decode_utf8().ok()?;
    let route = match decoded.trim_end_matches('/') {
        "" => "/",
        route => route,
    };
    let internal = route.starts_with("/_next") || route.starts_with("/__next");
    let private = route.split('/').any(|segment| segment.starts_with('_') || segment == "..");
    (!internal && !private && !is_api_route(route)).then(|| route.to_string())
}

fn page_scripts(build_id: &str, route: &str) -> Vec<String> {
    vec![
        format!("/_next/static/{build_id}/pages/_app.js"),
        format!("/_next/static/{build_id}/{}.js", bundle_path(route)),
        hmr_client_url(build_id),
    ]
}

fn fallback_scripts(build_id: &str) -> Vec<String> {
    vec![
        format!("/_next/static/{build_id}/fallback/pages/_app.js"),
        format!("/_next/static/{build_id}/fallback/pages/_error.js"),
        hmr_client_url(build_id),
    ]
}

fn render_shell(route: &str, body: &str, scripts: Vec<String>) -> String {
    SHELL_HTML.render(&ShellVars {
        title: response::escape_html(route),
        page: response::escape_html(route),
        body: response::escape_html(body),
        scripts: scripts.iter().map(|s| response::escape_html(s)).collect(),
    })
}
