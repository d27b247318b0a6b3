//! Domain models and relational storage for the ModernBlog platform.
//!
//! Everything that touches SQLite lives here: the per-domain store types,
//! the schema bootstrap, and the pure query/filter helpers the backend
//! builds its list endpoints on.

pub mod accounts_store;
pub mod blog_store;
pub mod comments_store;
pub mod contact_store;
pub mod db;
pub mod engagement_store;
pub mod error;
pub mod models;
pub mod query;
pub mod site_settings_store;
pub mod text;

pub use db::{Database, Scope};
pub use error::{FieldError, StoreError, StoreResult};
pub use models::{
    BlogListItem, BlogRecord, BlogStatus, BookmarkRecord, CategoryRecord, CommentRecord,
    CommentStatus, ContactMessageRecord, LikeRecord, NewsletterRecord, SiteInfoRecord, TagRecord,
    TagRef, UserRecord,
};
