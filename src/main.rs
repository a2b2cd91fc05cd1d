use std::env::var;
use std::net::SocketAddr;

use anyhow::{anyhow, Context};
use tracing_subscriber::EnvFilter;

struct AppValues {
    port: u16,
    mongodb_uri: String,
    db_name: String,
    jwt_secret: String,
}

fn get_values() -> ::anyhow::Result<AppValues> {
    let port = var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(3000);

    let mongodb_uri = var("MONGODB_URI").map_err(|_| anyhow!("`MONGODB_URI` is required"))?;
    let db_name = var("DB_NAME").unwrap_or_else(|_| "nerdtalks".to_owned());
    let jwt_secret = var("JWT_SECRET").map_err(|_| anyhow!("`JWT_SECRET` is required"))?;

    Ok(AppValues {
        port,
        mongodb_uri,
        db_name,
        jwt_secret,
    })
}

#[tokio::main]
async fn main() -> ::anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let values = get_values()?;

    let app = nerdtalks::mongo(&values.mongodb_uri, &values.db_name, &values.jwt_secret)
        .await
        .context("cannot reach the document store")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], values.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;

    tracing::info!(%addr, "nerds are talking");

    axum::serve(listener, app).await?;

    Ok(())
}
