use std::sync::Arc;

use link_bookmarks::{api, config::ServerConfig, database};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "link_bookmarks=debug,warp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load configuration: {}", e);
            std::process::exit(1);
        },
    };

    tracing::info!("loaded configuration: {:?}", config);

    let db = match database::Db::new(&config.database_path) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(
                "failed to open {}: {:?}",
                config.database_path.display(),
                e
            );
            std::process::exit(1);
        },
    };

    let server = Arc::new(api::ServerInner {
        db,
        tokens : config.token_issuer(),
    });

    tracing::info!("listening on {}", config.listen_addr);
    warp::serve(api::routes(&server))
        .run(config.listen_addr)
        .await;
}
