//! CLI route: single route table and run context.

use crate::api::{self, ApiState};
use crate::config::{CollectorConfig, ConfigLoader};
use crate::informer::{claim_ref, StatusReport, StatusReporter};
use crate::reconciler::{Reconciler, ReconcilerSettings};
use crate::registry::RegistryFile;
use crate::remote::GitHubRepository;
use crate::store::StatusStore;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cli::parse::Commands;

/// Runtime context for CLI execution: the loaded configuration.
pub struct RunContext {
    config: CollectorConfig,
}

impl RunContext {
    /// Load configuration from every source, honoring an explicit `--config` file.
    pub fn new(config_path: Option<PathBuf>) -> Result<Self> {
        let config = ConfigLoader::load(config_path.as_deref())
            .context("failed to load configuration")?;
        Ok(Self { config })
    }

    pub fn from_config(config: CollectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Execute a command and return its output for stdout.
    pub async fn execute(&self, command: &Commands) -> Result<String> {
        match command {
            Commands::Serve => self.serve().await,
            Commands::Report {
                collector_url,
                cluster,
                namespace,
                name,
                status,
            } => {
                let reporter = StatusReporter::new(collector_url)?;
                let report = StatusReport::new(cluster, claim_ref(namespace, name), status);
                reporter.send(&report).await?;
                Ok(format!(
                    "Reported {} on {}: {}",
                    report.claim_ref, report.cluster, report.status_message
                ))
            }
            Commands::CheckRegistry { file } => check_registry(file),
            Commands::Config => Ok(self.config.redacted().to_toml()?),
            Commands::Version => Ok(format!(
                "status-collector {}\ncommit: {}",
                env!("CARGO_PKG_VERSION"),
                option_env!("STATUS_COLLECTOR_COMMIT").unwrap_or("none")
            )),
        }
    }

    /// Run the ingestion API and the reconciler until SIGINT/SIGTERM.
    async fn serve(&self) -> Result<String> {
        let config = &self.config;
        config.validate()?;

        let store = Arc::new(StatusStore::new());
        let remote = Arc::new(
            GitHubRepository::from_config(&config.registry)
                .context("failed to create GitHub client")?,
        );
        let reconciler = Reconciler::new(
            Arc::clone(&store),
            remote,
            ReconcilerSettings::from_config(config),
        );

        let bind_address = config.server.bind_address();
        let listener = TcpListener::bind(&bind_address)
            .await
            .with_context(|| format!("failed to bind {}", bind_address))?;

        let cancel = CancellationToken::new();
        let reconciler_task = tokio::spawn({
            let cancel = cancel.clone();
            async move { reconciler.run(cancel).await }
        });
        let mut server_task = tokio::spawn(api::serve(
            listener,
            api::router(ApiState::new(store)),
            cancel.clone(),
        ));

        let early_exit = tokio::select! {
            signal = shutdown_signal() => {
                info!(signal, "Received signal, shutting down");
                None
            }
            joined = &mut server_task => Some(joined),
        };

        cancel.cancel();
        let server_result = match early_exit {
            Some(joined) => {
                error!("Ingestion API exited unexpectedly");
                joined
            }
            None => server_task.await,
        };
        reconciler_task.await.context("reconciler task failed")?;
        server_result
            .context("ingestion API task failed")?
            .context("ingestion API error")?;

        Ok("Collector stopped".to_string())
    }
}

fn check_registry(file: &Path) -> Result<String> {
    let data = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let registry = RegistryFile::parse(&data)
        .with_context(|| format!("{} is not a valid registry document", file.display()))?;
    Ok(format_registry_summary(&registry))
}

/// Human-readable summary of a registry document
pub fn format_registry_summary(registry: &RegistryFile) -> String {
    let mut lines = vec![format!(
        "{} clusters, {} claims",
        registry.cluster_count(),
        registry.claim_count()
    )];
    for (cluster, claims) in &registry.clusters {
        lines.push(format!("  {}: {} claims", cluster, claims.len()));
    }
    lines.join("\n")
}

async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGINT");
                std::future::pending().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                "SIGTERM"
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending().await
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        signal = ctrl_c => signal,
        signal = terminate => signal,
    }
}
