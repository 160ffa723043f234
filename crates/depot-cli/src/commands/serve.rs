//! The `serve` command: build everything and run the HTTP server

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use clap::Args;
use depot_core::DepotConfig;
use depot_files::handlers::{configure_routes, FilesApiDoc, FilesAppState};
use depot_files::{FileService, UploadPolicy};
use depot_metadata::MongoMetadataStore;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Args)]
pub struct ServeCommand {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1:3000", env = "DEPOT_ADDRESS")]
    pub address: String,

    /// Path to the JSON settings file
    #[arg(long, default_value = "depot.json", env = "DEPOT_CONFIG")]
    pub config: PathBuf,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let config = DepotConfig::from_file(&self.config)
            .with_context(|| format!("loading configuration from {}", self.config.display()))?;

        debug!("loaded configuration: backend {:?}", config.backend);

        let whitelist = depot_core::load_whitelist(&config.whitelist_path).with_context(|| {
            format!(
                "loading upload whitelist from {}",
                config.whitelist_path.display()
            )
        })?;

        info!(
            "starting depot on {} ({:?} backend, {} allowed type(s))",
            self.address,
            config.backend,
            whitelist.len()
        );

        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run(config, whitelist))
    }

    async fn run(
        &self,
        config: DepotConfig,
        whitelist: Vec<depot_core::AllowedType>,
    ) -> anyhow::Result<()> {
        let blob_store = depot_storage::build_blob_store(&config)
            .await
            .context("initializing blob backend")?;

        let metadata = Arc::new(
            MongoMetadataStore::new(&config.mongo)
                .await
                .context("connecting to MongoDB")?,
        );

        let policy = UploadPolicy::new(
            config.limits.max_file_size_bytes,
            config.limits.max_file_count,
            whitelist,
        );

        let file_service = Arc::new(FileService::new(blob_store, metadata, policy));
        let app_state = Arc::new(FilesAppState { file_service });

        // The policy enforces the per-file limit; the transport limit
        // only has to admit a whole multipart batch plus framing.
        let body_limit = (config.limits.max_file_size_bytes as usize).saturating_mul(4);

        let app = Router::new()
            .nest("/api", configure_routes().with_state(app_state))
            .merge(
                SwaggerUi::new("/swagger-ui")
                    .url("/api-docs/openapi.json", FilesApiDoc::openapi()),
            )
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(TraceLayer::new_for_http());

        let listener = tokio::net::TcpListener::bind(&self.address)
            .await
            .with_context(|| format!("binding {}", self.address))?;

        info!("listening on {}", self.address);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")?;

        info!("shut down cleanly");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        return;
    }
    info!("ctrl-c received, shutting down");
}
