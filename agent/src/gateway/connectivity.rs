//! Network reachability oracle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Answers whether network calls are worth attempting.
#[async_trait]
pub trait Connectivity: Send + Sync {
    /// Link-layer connectivity as reported by the host OS.
    fn is_connected(&self) -> bool;

    /// Whether the backend can actually be reached. Defaults to link state.
    async fn is_internet_reachable(&self) -> bool {
        self.is_connected()
    }

    /// Link up and backend reachable.
    async fn is_online(&self) -> bool {
        self.is_connected() && self.is_internet_reachable().await
    }
}

/// Link state pushed in by the host. Starts online.
#[derive(Debug, Clone)]
pub struct ConnectivityFlag {
    connected: Arc<AtomicBool>,
}

impl ConnectivityFlag {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(connected)),
        }
    }

    /// Store the new state and return the previous one.
    pub fn set(&self, connected: bool) -> bool {
        self.connected.swap(connected, Ordering::SeqCst)
    }
}

impl Default for ConnectivityFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Connectivity for ConnectivityFlag {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Link state from a [`ConnectivityFlag`] plus a HEAD probe against the
/// backend for reachability.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: Client,
    url: String,
    link: ConnectivityFlag,
}

impl HttpProbe {
    const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(url: impl Into<String>, link: ConnectivityFlag) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Self::PROBE_TIMEOUT).build()?;
        Ok(Self {
            http,
            url: url.into(),
            link,
        })
    }

    pub fn link(&self) -> &ConnectivityFlag {
        &self.link
    }
}

#[async_trait]
impl Connectivity for HttpProbe {
    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Any HTTP answer counts as reachable, including 4xx/5xx.
    async fn is_internet_reachable(&self) -> bool {
        match self.http.head(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!(url = %self.url, "Reachability probe failed: {}", e);
                false
            }
        }
    }
}
