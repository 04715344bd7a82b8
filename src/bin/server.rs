//! Contentful-backed multi-tenant GraphQL gateway server

use content_graphql_gateway::{Config, Gateway};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("starting server at {}", config.bind_addr());

    let gateway = Gateway::builder().from_config(&config)?.build()?;
    let app = gateway.into_router();

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("content backend running");
    info!(
        "GraphiQL available at http://{}{}{{event}}/graphiql",
        config.bind_addr(),
        config.base_path
    );
    info!(
        "GraphQL endpoint at http://{}{}{{event}}/graphql",
        config.bind_addr(),
        config.base_path
    );

    axum::serve(listener, app).await?;
    Ok(())
}
