use ahash::AHashMap;
use async_trait::async_trait;
use bytes::Bytes;
use http::{header, Method, Request, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

use super::{ClientPool, RateClient};
use crate::error::{RateStoreError, Result};
use crate::ratestore::StreamRate;

/// Path every node serves its stream rates on
pub const STREAM_RATES_PATH: &str = "/stream_rates";

type HttpClient = Client<HttpConnector, Empty<Bytes>>;

/// JSON body returned by a node's stream rates endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRatesResponse {
    #[serde(default)]
    pub stream_rates: Vec<StreamRate>,
}

/// Stream rate client for a single node over HTTP/1.1
pub struct HttpRateClient {
    addr: String,
    uri: Uri,
    http: HttpClient,
}

impl HttpRateClient {
    fn new(addr: &str, http: HttpClient) -> Result<Self> {
        let uri: Uri = format!("http://{addr}{STREAM_RATES_PATH}").parse().map_err(
            |e: http::uri::InvalidUri| RateStoreError::ClientUnavailable {
                addr: addr.to_string(),
                reason: e.to_string(),
            },
        )?;
        Ok(Self { addr: addr.to_string(), uri, http })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn rpc_error(&self, reason: impl ToString) -> RateStoreError {
        RateStoreError::Rpc { addr: self.addr.clone(), reason: reason.to_string() }
    }
}

#[async_trait]
impl RateClient for HttpRateClient {
    async fn stream_rates(&self) -> Result<Vec<StreamRate>> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(self.uri.clone())
            .header(header::ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| RateStoreError::Http(format!("Failed to build request: {e}")))?;

        let resp = self.http.request(req).await.map_err(|e| self.rpc_error(e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(self.rpc_error(format!("unexpected status {status}")));
        }

        let body = resp
            .into_body()
            .collect()
            .await
            .map_err(|e| self.rpc_error(e))?
            .to_bytes();
        let parsed: StreamRatesResponse =
            serde_json::from_slice(&body).map_err(|e| self.rpc_error(e))?;

        debug!(addr = %self.addr, streams = parsed.stream_rates.len(), "fetched stream rates");
        Ok(parsed.stream_rates)
    }
}

/// Pool of per-node stream rate clients
///
/// All clients share one hyper connection pool; the per-address map only
/// caches the parsed endpoint so repeated refreshes do not re-parse it.
pub struct HttpClientPool {
    http: HttpClient,
    clients: RwLock<AHashMap<String, Arc<HttpRateClient>>>,
}

impl HttpClientPool {
    pub fn new(idle_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_keepalive(Some(idle_timeout));

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_idle_timeout(idle_timeout);

        Self { http: builder.build(connector), clients: RwLock::new(AHashMap::new()) }
    }

    /// Number of cached node clients
    pub fn len(&self) -> usize {
        self.clients.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, addr: &str) -> Option<Arc<HttpRateClient>> {
        match self.clients.read() {
            Ok(guard) => guard.get(addr).cloned(),
            Err(_) => {
                warn!("Client pool lock poisoned");
                None
            }
        }
    }
}

impl Default for HttpClientPool {
    fn default() -> Self {
        Self::new(Duration::from_secs(90))
    }
}

impl ClientPool for HttpClientPool {
    fn client_for(&self, addr: &str) -> Result<Arc<dyn RateClient>> {
        if let Some(client) = self.cached(addr) {
            let client: Arc<dyn RateClient> = client;
            return Ok(client);
        }

        let client = Arc::new(HttpRateClient::new(addr, self.http.clone())?);
        let mut guard = self.clients.write().map_err(|_| RateStoreError::ClientUnavailable {
            addr: addr.to_string(),
            reason: "client pool lock poisoned".to_string(),
        })?;
        let client: Arc<dyn RateClient> = guard.entry(addr.to_string()).or_insert(client).clone();
        Ok(client)
    }

    fn evict(&self, addr: &str) {
        match self.clients.write() {
            Ok(mut guard) => {
                if guard.remove(addr).is_some() {
                    debug!(%addr, "evicted stream rate client");
                }
            }
            Err(_) => warn!("Client pool lock poisoned"),
        }
    }
}
