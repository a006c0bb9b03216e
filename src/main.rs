use anyhow::Context;
use deepdive::api::{self, app_state::AppState};
use deepdive::config::AppConfig;
use deepdive::config::loader::ConfigLoader;
use deepdive::llm::create_completion;
use deepdive::observability::{HealthCheckResult, ObservabilityState, ResearchMetrics, init_tracing};
use deepdive::search::{DirectScrapeBackend, HostedCrawlBackend, HttpPageFetcher, SearchBackend};
use deepdive::services::{
    HypothesisAnalyzer, PageAnalyzer, ResearchOrchestrator, ResultAggregator,
};
use deepdive::storage::{JsonFileSink, ResultSink};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    ConfigLoader::validate(&config).context("invalid configuration")?;
    let _log_guard = init_tracing(&config.logging);

    info!("Starting Deepdive ({})...", config.environment);
    info!("Configuration loaded successfully");

    let metrics = Arc::new(ResearchMetrics::new());
    let observability_state = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION"),
        metrics.clone(),
    ));

    let backends = create_backends(&config)?;
    let backend_names: Vec<String> = backends.iter().map(|b| b.name().to_string()).collect();
    info!("Search backends initialized: {:?}", backend_names);
    observability_state
        .add_health_check(HealthCheckResult::new(
            "search_backends",
            !backends.is_empty(),
            format!("{} configured", backends.len()),
        ))
        .await;

    let aggregator =
        ResultAggregator::from_config(backends, &config.search).with_metrics(metrics.clone());

    let completion = create_completion(&config.llm)
        .with_context(|| format!("failed to create {} completion backend", config.llm.backend))?;
    info!(
        "Completion backend initialized: {} (model: {})",
        completion.name(),
        config.llm.model
    );
    observability_state
        .add_health_check(HealthCheckResult::new(
            "completion",
            true,
            config.llm.backend.clone(),
        ))
        .await;
    let analyzer = Arc::new(
        HypothesisAnalyzer::from_config(Arc::from(completion), &config.llm)
            .with_metrics(metrics.clone()),
    );
    let page_analyzer = PageAnalyzer::new(
        Arc::new(HttpPageFetcher::new(&config.search.user_agent)),
        analyzer.clone(),
        Duration::from_secs(config.search.backend_timeout_secs),
    );

    let mut orchestrator = ResearchOrchestrator::new(
        Arc::new(aggregator),
        analyzer,
        config.graph.clone(),
    )
    .with_metrics(metrics.clone());
    if let Some(sink) = JsonFileSink::from_config(&config.storage) {
        info!("Saving research snapshots to {}", sink.output_dir().display());
        orchestrator = orchestrator.with_sink(Arc::new(sink) as Arc<dyn ResultSink>);
    }

    let app_state = AppState::new(Arc::new(orchestrator), Arc::new(page_analyzer), backend_names)
        .with_request_timeout(Duration::from_secs(config.server.request_timeout));
    let router = api::initialize_api(app_state, observability_state)
        .await
        .context("failed to initialize API router")?;
    info!("API router created with observability endpoints");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}

/// Search backends in priority order: browser, hosted crawl, direct scrape
fn create_backends(config: &AppConfig) -> anyhow::Result<Vec<Arc<dyn SearchBackend>>> {
    let search = &config.search;
    let mut backends: Vec<Arc<dyn SearchBackend>> = Vec::new();

    if search.browser.enabled {
        #[cfg(feature = "browser")]
        {
            use deepdive::search::chromium::ChromiumLauncher;
            use deepdive::search::{PrimaryBrowserBackend, SessionPool};

            let launcher = Arc::new(ChromiumLauncher::new(
                search.browser.clone(),
                &search.user_agent,
            ));
            let pool = Arc::new(SessionPool::new(launcher, search.browser.pool_size));
            backends.push(Arc::new(PrimaryBrowserBackend::new(
                pool,
                &search.browser.search_base_url,
                search.browser.max_pages,
            )));
        }
        #[cfg(not(feature = "browser"))]
        warn!("Browser backend enabled in config but the 'browser' feature is not compiled in");
    }

    if search.hosted.is_usable() {
        match HostedCrawlBackend::new(
            &search.hosted,
            Duration::from_secs(search.backend_timeout_secs),
        ) {
            Ok(backend) => backends.push(Arc::new(backend)),
            Err(e) => warn!("Hosted crawl backend disabled: {}", e),
        }
    } else if search.hosted.enabled {
        info!("Hosted crawl backend skipped: no API key configured");
    }

    backends.push(Arc::new(
        DirectScrapeBackend::new(search).context("failed to create scrape backend")?,
    ));
    Ok(backends)
}
