use std::sync::Arc;

use ktop::{
    dashboard_config_from_env, dashboard_router, init_logging, log_app_bind, log_app_start,
    log_source_selected, logging_config_from_env, BoardSource, MarketPageFetcher,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let cfg = dashboard_config_from_env();
    log_source_selected(
        &cfg.fetcher.base_url,
        cfg.fetcher.field_set,
        cfg.fetcher.http_timeout_ms,
    );

    let source: Arc<dyn BoardSource> = Arc::new(MarketPageFetcher::live(cfg.fetcher));
    let app = dashboard_router(source);
    let listener = tokio::net::TcpListener::bind(cfg.addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
