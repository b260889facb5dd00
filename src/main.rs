mod config;
mod controller;
mod error;
mod routes;
mod storage;
mod utils;
mod vault;

#[cfg(test)]
mod tests;

#[macro_use]
extern crate tracing;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use poem::listener::TcpListener;
use poem::middleware::Tracing;
use poem::{EndpointExt, Route, Server};
use poem_openapi::OpenApiService;
use tracing::Level;

use crate::controller::PhotoFacade;
use crate::routes::PhotoApi;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Debug, Parser)]
#[clap(author, version, about)]
pub struct ServerConfig {
    #[clap(long, default_value = "127.0.0.1", env)]
    /// The binding host address of the server.
    host: String,

    #[clap(short, long, default_value = "8000", env)]
    port: u16,

    #[clap(long, env)]
    /// The external URL that would be used to access the server if applicable.
    ///
    /// This only affects the documentation.
    base_url: Option<String>,

    #[clap(long, env)]
    /// The path to serve the API docs at, docs are disabled if not set.
    docs_url: Option<String>,

    #[clap(long, default_value = "info", env)]
    /// The log level filter, any logs that are above this level won't
    /// be displayed.
    log_level: Level,

    #[clap(long, env)]
    /// The file path to the YAML config file.
    config_file: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: ServerConfig = ServerConfig::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let cfg = config::RuntimeConfig::load(&args.config_file)
        .await
        .with_context(|| format!("Failed to load config from {:?}", &args.config_file))?;

    let storage = cfg.backend.connect().await?;
    let facade = Arc::new(PhotoFacade::new(Arc::new(cfg.photos), storage));

    let bind: SocketAddr = format!("{}:{}", &args.host, args.port).parse()?;
    let server_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| format!("http://{}/v1", bind));

    let api_service = OpenApiService::new(
        PhotoApi::new(facade),
        "Photoshelf API",
        env!("CARGO_PKG_VERSION"),
    )
    .server(server_url);

    let mut app = Route::new();
    if let Some(docs_url) = &args.docs_url {
        app = app.nest(docs_url, api_service.redoc());
    }
    let app = app.nest("/v1", api_service).with(Tracing);

    info!("Photoshelf is now listening @ http://{}", bind);
    Server::new(TcpListener::bind(bind)).run(app).await?;

    Ok(())
}
