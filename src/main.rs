//! decoy-shell: serve the shell decoy over plain TCP.
//!
//! Configuration comes from `DECOY_*` environment variables; diagnostics go
//! to stderr filtered by `RUST_LOG`.

use std::sync::Arc;

use anyhow::{Context, Result};
use llm_api::{LlmApiClient, LlmApiConfig};
use session_store::{EventLog, SessionStore, EVENT_LOG_FILE};
use time::UtcOffset;
use tokio::net::TcpListener;

use decoy_shell::{
    init_tracing, Credentials, Dispatcher, EnvConfig, FallbackAdapter, FsTemplate, Identity,
    Server, SessionContext, SessionLimits,
};

fn main() -> Result<()> {
    init_tracing();

    // The local offset is unavailable once worker threads exist.
    let local_offset = UtcOffset::current_local_offset().unwrap_or_else(|error| {
        tracing::warn!(%error, "local UTC offset unknown, reporting UTC");
        UtcOffset::UTC
    });
    let config = EnvConfig::from_env().context("invalid configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to initialize tokio runtime")?;
    runtime.block_on(run(config, local_offset))
}

async fn run(config: EnvConfig, local_offset: UtcOffset) -> Result<()> {
    let identity =
        Identity::new(&config.user, &config.hostname).with_utc_offset(local_offset);
    let template = match &config.template_path {
        Some(path) => FsTemplate::load(path)?,
        None => FsTemplate::decoy(&identity).context("built-in template is inconsistent")?,
    };

    let llm = LlmApiClient::new(
        LlmApiConfig::new(&config.llm_model)
            .with_base_url(&config.llm_url)
            .with_timeout(config.llm_timeout),
    )
    .context("failed to build generative service client")?;
    tracing::info!(endpoint = %llm.normalized_endpoint(), model = %config.llm_model, "fallback configured");

    let events = EventLog::open(config.log_dir.join(EVENT_LOG_FILE))
        .context("failed to open event log")?;
    let context = SessionContext {
        identity,
        template,
        dispatcher: Dispatcher::new(FallbackAdapter::new(llm).with_timeout(config.llm_timeout)),
        events: Arc::new(events),
        store: SessionStore::new(&config.log_dir),
        limits: SessionLimits::default(),
    };

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    let server = Server::new(
        listener,
        Arc::new(context),
        Credentials::new(&config.user, &config.password),
        config.max_sessions,
    );
    tracing::info!(
        addr = %config.listen_addr,
        max_sessions = config.max_sessions,
        log_dir = %config.log_dir.display(),
        "decoy shell listening"
    );

    tokio::select! {
        result = server.serve() => result.context("accept loop failed")?,
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for ctrl-c")?;
            tracing::info!("shutting down");
        }
    }
    Ok(())
}
