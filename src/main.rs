//! Swap route engine - cross-chain swap routing over a remote route service
//!
//! Loads the chain registry, keeps the route service chain list fresh and
//! optionally quotes a configured pair at startup.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

use swap_route_engine::chain::{ChainRegistry, CoinPretty, EvmGasSimulator};
use swap_route_engine::config::{QuoteConfig, Settings};
use swap_route_engine::metrics::{self, MetricsServer};
use swap_route_engine::service::{
    ConfiguredSwapUsage, HttpRouteServiceClient, RouteParams, RouteServiceClient, SwapQueries,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting swap route engine v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    info!("Loaded configuration for {} chains", settings.chains.len());

    // Start metrics server
    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    let registry = Arc::new(ChainRegistry::from_settings(&settings));
    let client: Arc<dyn RouteServiceClient> =
        Arc::new(HttpRouteServiceClient::new(&settings.route_service)?);
    let swap_usage = Arc::new(ConfiguredSwapUsage::from_settings(&settings));
    let queries = Arc::new(SwapQueries::new(
        &settings,
        client,
        registry.clone(),
        swap_usage,
    ));
    info!("Route service client initialized for {}", settings.route_service.base_url);

    let simulator = EvmGasSimulator::from_registry(&registry);
    if simulator.provider_count() == 0 {
        warn!("No EVM RPC endpoints configured, EVM transactions cannot be simulated");
    } else {
        info!("Gas simulation enabled for {} EVM chains", simulator.provider_count());
    }

    refresh_chains(&queries).await;

    if let Some(quote) = &settings.quote {
        if let Err(e) = quote_pair(&queries, quote, settings.swap.affiliate_fee_bps).await {
            warn!("Startup quote failed: {:#}", e);
        }
    }

    // Keep the chain list fresh
    let refresh_handle = tokio::spawn({
        let queries = queries.clone();
        let period = settings.engine.chains_refresh_interval_secs;
        async move {
            let mut ticker = interval(Duration::from_secs(period));
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                refresh_chains(&queries).await;
            }
        }
    });

    info!("Swap route engine is running");
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    refresh_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("Swap route engine stopped");
    Ok(())
}

/// Refetch the chain list and report which configured chains it supports
async fn refresh_chains(queries: &SwapQueries) {
    let chains = queries.chains();
    chains.fetch().await;

    if let Some(e) = chains.query().error() {
        warn!("Failed to refresh route service chains: {}", e);
        return;
    }

    let supported = chains.chains();
    metrics::record_supported_chains(supported.len());
    info!("Route service supports {} configured chains", supported.len());

    for chain_id in queries.registry().chain_ids() {
        info!(
            "Chain {}: pfm_enabled={}, supports_memo={}",
            chain_id,
            chains.is_pfm_enabled(&chain_id),
            chains.is_supports_memo(&chain_id)
        );
    }
}

/// Quote the configured pair once and log the result
async fn quote_pair(queries: &SwapQueries, quote: &QuoteConfig, affiliate_fee_bps: u32) -> Result<()> {
    let currency = queries
        .registry()
        .get_chain(&quote.source_chain_id)?
        .find_currency(&quote.source_denom)
        .cloned()
        .with_context(|| {
            format!(
                "Unknown currency {} on {}",
                quote.source_denom, quote.source_chain_id
            )
        })?;
    let amount = CoinPretty::from_decimal_str(currency, &quote.amount)?;
    let venue = queries
        .primary_swap_venue()
        .cloned()
        .context("No swap venue configured")?;

    let params = RouteParams::new(
        &quote.source_chain_id,
        &amount,
        &quote.dest_chain_id,
        &quote.dest_denom,
        affiliate_fee_bps,
        venue,
    );
    let route = queries.route(&params);
    route.fetch().await;

    if let Some(e) = route.query().error() {
        anyhow::bail!("Route quote failed: {}", e);
    }

    let fees = route
        .swap_fee()?
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    info!(
        "Quote {} on {} -> {} on {} (price impact {:?}, fees [{}])",
        amount,
        quote.source_chain_id,
        route.out_amount(),
        quote.dest_chain_id,
        route.swap_price_impact(),
        fees
    );
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,swap_route_engine=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
