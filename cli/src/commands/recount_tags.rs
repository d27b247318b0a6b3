use std::path::Path;

use anyhow::Result;
use modern_blog_shared::blog_store::BlogStore;
use modern_blog_shared::Database;

/// Reconciliation pass: the stored usage counters are derived state and may
/// drift; this recomputes all of them from the join table.
pub fn run(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path)?;
    let store = BlogStore::new(db);
    let updated = store.recount_tag_usage()?;
    tracing::info!("recounted usage for {updated} tags");
    Ok(())
}
