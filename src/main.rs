use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use alloy_primitives::Address;
use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use hitch::{config, connect, BlockRange, BoundContract, EndpointKind, Schema, SchemaScanner};

#[derive(Debug, Parser)]
#[command(
    name = "hitch",
    version,
    about = "Hitch: bind a contract ABI and stream its events"
)]
struct Args {
    /// HTTP JSON-RPC endpoint (e.g. http://localhost:8545)
    #[arg(long)]
    rpc: Option<String>,

    /// WebSocket endpoint (e.g. ws://localhost:8546)
    #[arg(long)]
    ws: Option<String>,

    /// IPC path (e.g. ~/.ethereum/geth.ipc). Unix only.
    #[arg(long)]
    ipc: Option<PathBuf>,

    /// Named endpoint from the config file
    #[arg(long)]
    endpoint: Option<String>,

    /// Deployed contract address
    #[arg(long)]
    address: String,

    /// Path to the contract's ABI JSON (raw array or build artifact)
    #[arg(long)]
    abi: Option<PathBuf>,

    /// Root directory to scan for ABI artifacts instead of --abi
    #[arg(long)]
    abi_dir: Option<PathBuf>,

    /// Contract name to pick from the scanned artifacts
    #[arg(long)]
    contract: Option<String>,

    /// Event name to stream
    event: String,

    /// First block of the historical query
    #[arg(long)]
    from: Option<u64>,

    /// Last block of the historical query (default: latest)
    #[arg(long)]
    to: Option<u64>,

    /// Follow the live feed instead of backfilling
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = config::load();
    let kind = endpoint_from_args(&args, &config)?;

    let address: Address = args
        .address
        .parse()
        .context("Invalid contract address")?;
    let schema = resolve_schema(&args, &config)?;

    let backend = Arc::new(connect(kind).await?);
    let contract = BoundContract::builder(address, schema)
        .backend(backend)
        .build();

    if args.watch {
        watch(&contract, &args.event).await
    } else {
        backfill(&contract, &args.event, args.from, args.to).await
    }
}

/// Drain the historical query, one JSON record per line.
async fn backfill(
    contract: &BoundContract,
    event: &str,
    from: Option<u64>,
    to: Option<u64>,
) -> Result<()> {
    let range = BlockRange {
        from: from.unwrap_or(0),
        to,
    };
    let mut iter = contract.filter_logs(event, &[], range).await?;

    while let Some(record) = iter.next() {
        println!("{}", record.to_json());
    }
    if let Some(err) = iter.error() {
        bail!("event stream failed: {err}");
    }
    Ok(())
}

/// Follow the live feed until Ctrl-C, then cancel cooperatively.
async fn watch(contract: &BoundContract, event: &str) -> Result<()> {
    let (sink, mut records) = mpsc::channel(64);
    let subscription = contract.watch_logs(event, &[], sink).await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            record = records.recv() => match record {
                Some(record) => println!("{}", record.to_json()),
                None => break,
            },
        }
    }

    subscription.cancel().await?;
    Ok(())
}

/// Load the schema from an explicit ABI file, or discover it by contract
/// name from the scan roots (--abi-dir, falling back to the config's
/// abi_paths).
fn resolve_schema(args: &Args, config: &config::Config) -> Result<Arc<Schema>> {
    if let Some(path) = &args.abi {
        let abi_json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        return Ok(Arc::new(Schema::parse(&abi_json)?));
    }

    let Some(name) = &args.contract else {
        bail!("Pass --abi <file>, or --contract <name> with --abi-dir / configured abi_paths");
    };

    let roots: Vec<PathBuf> = match &args.abi_dir {
        Some(dir) => vec![dir.clone()],
        None => config.abi_paths.iter().map(PathBuf::from).collect(),
    };
    if roots.is_empty() {
        bail!("No ABI scan roots: pass --abi-dir or set abi_paths in the config file");
    }

    let set = SchemaScanner::scan_roots(&roots);
    for err in &set.errors {
        tracing::warn!("abi scan: {err}");
    }
    match set.get(name) {
        Some(schema) => Ok(schema.clone()),
        None => {
            let mut known: Vec<_> = set.names().collect();
            known.sort_unstable();
            bail!(
                "No contract named '{name}' in scanned artifacts (found: {})",
                known.join(", ")
            )
        }
    }
}

/// Resolve the endpoint from flags first, then the config file, then the
/// local default.
fn endpoint_from_args(args: &Args, config: &config::Config) -> Result<EndpointKind> {
    if let Some(url) = &args.ws {
        return Ok(EndpointKind::WebSocket(url.clone()));
    }
    if let Some(url) = &args.rpc {
        return Ok(EndpointKind::Http(url.clone()));
    }
    #[cfg(unix)]
    if let Some(path) = &args.ipc {
        return Ok(EndpointKind::Ipc(path.clone()));
    }

    if let Some(name) = &args.endpoint {
        let Some(endpoint) = config.endpoint(name) else {
            bail!("No endpoint named '{name}' in the config file");
        };
        // Watching needs a subscription-capable transport, so prefer ws.
        if args.watch {
            if let Some(ws) = &endpoint.ws {
                return Ok(EndpointKind::WebSocket(ws.clone()));
            }
        }
        if let Some(rpc) = &endpoint.rpc {
            return Ok(EndpointKind::Http(rpc.clone()));
        }
        if let Some(ws) = &endpoint.ws {
            return Ok(EndpointKind::WebSocket(ws.clone()));
        }
        #[cfg(unix)]
        if let Some(ipc) = &endpoint.ipc {
            return Ok(EndpointKind::Ipc(PathBuf::from(ipc)));
        }
        bail!("Endpoint '{name}' has no usable transport configured");
    }

    Ok(EndpointKind::Http("http://127.0.0.1:8545".to_string()))
}
