use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hello::data::{PgUserStore, open_pool};
use hello::{Application, Config, Error, Metrics, Server};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hello=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), Error> {
    if config.db_dsn.trim().is_empty() {
        return Err(Error::MissingDsn);
    }

    info!(env = %config.env, port = config.port, "starting");

    let pool = open_pool(&config.db()).await?;
    let users = Arc::new(PgUserStore::new(pool));
    let app = Application::new(config.env, users, Arc::new(Metrics::new()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    Server::bind(addr).serve(app.pipeline()).await
}
