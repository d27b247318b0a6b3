use modern_blog_shared::accounts_store::AccountsStore;
use modern_blog_shared::blog_store::BlogStore;
use modern_blog_shared::comments_store::CommentsStore;
use modern_blog_shared::contact_store::ContactStore;
use modern_blog_shared::engagement_store::EngagementStore;
use modern_blog_shared::models::CommentStatus;
use modern_blog_shared::site_settings_store::SiteSettingsStore;
use modern_blog_shared::Database;

use crate::email::EmailNotifier;

/// Shared application state: one store handle per domain over the same
/// database, plus runtime configuration.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountsStore,
    pub blogs: BlogStore,
    pub comments: CommentsStore,
    pub engagement: EngagementStore,
    pub contact: ContactStore,
    pub site: SiteSettingsStore,
    pub comment_default_status: CommentStatus,
    pub email: Option<EmailNotifier>,
}

impl AppState {
    pub fn new(
        db: Database,
        comment_default_status: CommentStatus,
        email: Option<EmailNotifier>,
    ) -> Self {
        Self {
            accounts: AccountsStore::new(db.clone()),
            blogs: BlogStore::new(db.clone()),
            comments: CommentsStore::new(db.clone()),
            engagement: EngagementStore::new(db.clone()),
            contact: ContactStore::new(db.clone()),
            site: SiteSettingsStore::new(db),
            comment_default_status,
            email,
        }
    }
}
