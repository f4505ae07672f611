use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use prometheus::Registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::health::RespBody;
use super::{
    handle_metrics, health_check_response, not_found_response, rate_response,
    ready_check_response,
};
use crate::error::Result;
use crate::ratestore::RateStore;

/// Route a request on the observability port
///
/// - `/metrics` - Prometheus metrics
/// - `/health` - Health check endpoint
/// - `/ready` - 200 while the rate store refresh loop runs
/// - `/rates/{stream}` - Current rate of an unsharded stream hash
pub fn route(path: &str, registry: &Registry, store: &RateStore) -> Result<Response<RespBody>> {
    match path {
        "/health" => health_check_response(),
        "/ready" => ready_check_response(store),
        "/metrics" => handle_metrics(registry),
        _ => match path.strip_prefix("/rates/") {
            Some(stream) => rate_response(store, stream),
            None => not_found_response(),
        },
    }
}

fn internal_error() -> Response<RespBody> {
    let body = Full::new(Bytes::from("Internal Server Error"))
        .map_err(|never| match never {})
        .boxed();
    let mut resp = Response::new(body);
    *resp.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
    resp
}

/// Serve metrics, health checks and rate lookups until `shutdown` fires
pub async fn start_observability_server(
    port: u16,
    registry: Registry,
    store: Arc<RateStore>,
    shutdown: CancellationToken,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = Arc::new(registry);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(?addr, "Observability server started (metrics + health checks)");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Observability server: shutting down");
                break;
            }
            result = listener.accept() => {
                let (stream, peer) = match result {
                    Ok((stream, peer)) => (stream, peer),
                    Err(e) => {
                        warn!(error = %e, "Observability server: accept error");
                        continue;
                    }
                };

                let registry = registry.clone();
                let store = store.clone();
                tokio::spawn(async move {
                    let svc = hyper::service::service_fn(move |req: Request<Incoming>| {
                        let registry = registry.clone();
                        let store = store.clone();
                        async move {
                            let resp = route(req.uri().path(), &registry, &store)
                                .unwrap_or_else(|_| internal_error());
                            Ok::<_, hyper::Error>(resp)
                        }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    if let Err(e) = builder.serve_connection(TokioIo::new(stream), svc).await {
                        warn!(?peer, error = %e, "Observability server: serve_connection error");
                    }
                });
            }
        }
    }

    info!("Observability server stopped");
    Ok(())
}
