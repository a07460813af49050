//! Alloy-backed transport implementations
//!
//! One enum over the HTTP/WebSocket/IPC transports so concrete provider
//! types stay callable, implementing the backend traits a contract
//! handle is bound with.

use std::path::PathBuf;

use alloy::network::Ethereum;
use alloy::providers::{
    fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
    Identity, Provider, ProviderBuilder, RootProvider,
};
use alloy::rpc::types::{Filter, Log, TransactionRequest};
use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::{bail, Context, Result};
use futures::StreamExt;
use tracing::debug;

use crate::domain::backend::{CallBackend, FeedProducer, LogBackend, LogFeed, TransactBackend};

/// How many raw logs a live feed buffers between the pump task and the
/// consumer before backpressuring.
const FEED_BUFFER: usize = 128;

/// Transport endpoint configuration.
#[derive(Debug, Clone)]
pub enum EndpointKind {
    /// HTTP JSON-RPC endpoint
    Http(String),
    /// WebSocket endpoint
    WebSocket(String),
    /// IPC socket path (Unix only)
    #[cfg(unix)]
    Ipc(PathBuf),
}

impl EndpointKind {
    /// Get display name for this endpoint
    pub fn display(&self) -> String {
        match self {
            EndpointKind::Http(url) => url.clone(),
            EndpointKind::WebSocket(url) => url.clone(),
            #[cfg(unix)]
            EndpointKind::Ipc(path) => path.display().to_string(),
        }
    }
}

// Type aliases for the filled providers
type HttpFillProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
    Ethereum,
>;

type WsFillProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
    Ethereum,
>;

#[cfg(unix)]
type IpcFillProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider,
    Ethereum,
>;

/// Enum-based backend that stores concrete provider types per transport.
pub enum AlloyBackend {
    Http {
        provider: HttpFillProvider,
        endpoint: String,
    },
    WebSocket {
        provider: WsFillProvider,
        endpoint: String,
    },
    #[cfg(unix)]
    Ipc {
        provider: IpcFillProvider,
        endpoint: String,
    },
}

/// Connect a backend for the given endpoint.
pub async fn connect(kind: EndpointKind) -> Result<AlloyBackend> {
    match kind {
        EndpointKind::Http(url) => {
            let rpc_url = url.parse().context("Invalid HTTP URL")?;
            let provider = ProviderBuilder::new().connect_http(rpc_url);
            Ok(AlloyBackend::Http {
                provider,
                endpoint: url,
            })
        }
        EndpointKind::WebSocket(url) => {
            let provider = ProviderBuilder::new()
                .connect(&url)
                .await
                .context("Failed to create WebSocket provider")?;
            Ok(AlloyBackend::WebSocket {
                provider,
                endpoint: url,
            })
        }
        #[cfg(unix)]
        EndpointKind::Ipc(path) => {
            use alloy::providers::IpcConnect;
            let ipc_path = path.to_string_lossy().to_string();
            let ipc = IpcConnect::new(ipc_path);
            let provider = ProviderBuilder::new()
                .connect_ipc(ipc)
                .await
                .context("Failed to create IPC provider")?;
            let display = path.display().to_string();
            Ok(AlloyBackend::Ipc {
                provider,
                endpoint: display,
            })
        }
    }
}

// Macro to reduce code duplication for backend method implementations
macro_rules! impl_backend_method {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        match $self {
            AlloyBackend::Http { provider, .. } => provider.$method($($arg),*).await,
            AlloyBackend::WebSocket { provider, .. } => provider.$method($($arg),*).await,
            #[cfg(unix)]
            AlloyBackend::Ipc { provider, .. } => provider.$method($($arg),*).await,
        }
    };
}

impl AlloyBackend {
    /// Get endpoint display name
    pub fn endpoint_name(&self) -> String {
        match self {
            AlloyBackend::Http { endpoint, .. } => endpoint.clone(),
            AlloyBackend::WebSocket { endpoint, .. } => endpoint.clone(),
            #[cfg(unix)]
            AlloyBackend::Ipc { endpoint, .. } => endpoint.clone(),
        }
    }

    /// Get the current head block number.
    pub async fn block_number(&self) -> Result<u64> {
        Ok(impl_backend_method!(self, get_block_number)?)
    }
}

#[async_trait::async_trait]
impl CallBackend for AlloyBackend {
    async fn call(&self, to: Address, calldata: Bytes) -> Result<Bytes> {
        let request = TransactionRequest::default().to(to).input(calldata.into());
        match self {
            AlloyBackend::Http { provider, .. } => Ok(provider.call(request.clone()).await?),
            AlloyBackend::WebSocket { provider, .. } => Ok(provider.call(request.clone()).await?),
            #[cfg(unix)]
            AlloyBackend::Ipc { provider, .. } => Ok(provider.call(request).await?),
        }
    }
}

#[async_trait::async_trait]
impl TransactBackend for AlloyBackend {
    async fn send_raw(&self, to: Address, calldata: Bytes, value: U256) -> Result<B256> {
        let request = TransactionRequest::default()
            .to(to)
            .input(calldata.into())
            .value(value);

        let pending = match self {
            AlloyBackend::Http { provider, .. } => {
                provider.send_transaction(request.clone()).await?
            }
            AlloyBackend::WebSocket { provider, .. } => {
                provider.send_transaction(request.clone()).await?
            }
            #[cfg(unix)]
            AlloyBackend::Ipc { provider, .. } => provider.send_transaction(request).await?,
        };

        Ok(*pending.tx_hash())
    }
}

#[async_trait::async_trait]
impl LogBackend for AlloyBackend {
    async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>> {
        Ok(impl_backend_method!(self, get_logs, filter)?)
    }

    async fn watch_logs(&self, filter: &Filter) -> Result<LogFeed> {
        let sub = match self {
            AlloyBackend::Http { .. } => {
                bail!("HTTP transport does not support log subscriptions")
            }
            AlloyBackend::WebSocket { provider, .. } => provider.subscribe_logs(filter).await?,
            #[cfg(unix)]
            AlloyBackend::Ipc { provider, .. } => provider.subscribe_logs(filter).await?,
        };

        let (producer, feed) = LogFeed::channel(FEED_BUFFER);
        tokio::spawn(pump_subscription(sub.into_stream(), producer));
        Ok(feed)
    }

    fn supports_watch(&self) -> bool {
        match self {
            AlloyBackend::Http { .. } => false,
            AlloyBackend::WebSocket { .. } => true,
            #[cfg(unix)]
            AlloyBackend::Ipc { .. } => true,
        }
    }
}

/// Forward a pubsub log stream into a feed until the consumer
/// unsubscribes or the stream ends. Dropping the stream tears down the
/// server-side subscription.
async fn pump_subscription(
    mut stream: impl futures::Stream<Item = Log> + Unpin,
    producer: FeedProducer,
) {
    let FeedProducer {
        logs,
        error,
        mut closed,
    } = producer;

    loop {
        tokio::select! {
            _ = &mut closed => {
                debug!("log feed unsubscribed by consumer");
                return;
            }
            next = stream.next() => match next {
                Some(log) => {
                    tokio::select! {
                        _ = &mut closed => {
                            debug!("log feed unsubscribed while delivering");
                            return;
                        }
                        sent = logs.send(log) => {
                            if sent.is_err() {
                                return;
                            }
                        }
                    }
                }
                None => {
                    // A pubsub stream only ends when the transport went
                    // away; that is a feed failure, not a clean close.
                    let _ = error.send(anyhow::anyhow!("log subscription stream ended"));
                    return;
                }
            },
        }
    }
}
