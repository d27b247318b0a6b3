mod auth;
mod email;
mod handlers;
mod markdown;
mod request_context;
mod routes;
mod state;

use std::env;
use std::path::PathBuf;

use anyhow::Result;
use modern_blog_shared::models::CommentStatus;
use modern_blog_shared::Database;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Default to info-level logs; override via RUST_LOG if needed.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let database_path =
        env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/modern_blog.db".to_string());
    let comment_default_status = resolve_comment_default_status()?;

    tracing::info!("Starting ModernBlog backend server");
    tracing::info!("Database: {database_path}");
    tracing::info!("Default comment status: {}", comment_default_status.as_str());

    let database_path = PathBuf::from(database_path);
    if let Some(parent) = database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open(&database_path)?;

    let email_notifier = match email::EmailNotifier::from_env() {
        Ok(notifier) => notifier,
        Err(err) => {
            tracing::warn!("email notifier disabled: {err:#}");
            None
        },
    };

    let app_state = state::AppState::new(db, comment_default_status, email_notifier);
    let app = routes::create_router(app_state);

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
    let addr = format!("{bind_addr}:{port}");
    tracing::info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// The original platform hardcodes new comments to `approved` while also
/// defining a moderation queue; surfaced here as configuration instead.
fn resolve_comment_default_status() -> Result<CommentStatus> {
    let raw = env::var("COMMENT_DEFAULT_STATUS").unwrap_or_else(|_| "approved".to_string());
    match raw.trim() {
        "approved" => Ok(CommentStatus::Approved),
        "pending" => Ok(CommentStatus::Pending),
        other => anyhow::bail!(
            "COMMENT_DEFAULT_STATUS must be `approved` or `pending`, got `{other}`"
        ),
    }
}
