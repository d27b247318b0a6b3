use std::path::Path;

use anyhow::{Context, Result};
use modern_blog_shared::Database;

/// Creates the database file (and parent directories) and bootstraps the
/// schema. Opening an existing database is a no-op beyond the migration.
pub fn run(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Database::open(db_path)?;
    tracing::info!("database ready at {}", db_path.display());
    Ok(())
}
