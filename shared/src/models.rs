//! Record types mirroring the relational schema. Timestamps are UTC
//! milliseconds; calendar dates are `YYYY-MM-DD` strings.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    Draft,
    Published,
    Archived,
}

impl BlogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BlogStatus::Draft => "draft",
            BlogStatus::Published => "published",
            BlogStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> StoreResult<Self> {
        match value {
            "draft" => Ok(BlogStatus::Draft),
            "published" => Ok(BlogStatus::Published),
            "archived" => Ok(BlogStatus::Archived),
            other => Err(StoreError::invalid(
                "status",
                format!("unknown blog status: {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
    Spam,
}

impl CommentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
            CommentStatus::Spam => "spam",
        }
    }

    pub fn parse(value: &str) -> StoreResult<Self> {
        match value {
            "pending" => Ok(CommentStatus::Pending),
            "approved" => Ok(CommentStatus::Approved),
            "rejected" => Ok(CommentStatus::Rejected),
            "spam" => Ok(CommentStatus::Spam),
            other => Err(StoreError::invalid(
                "status",
                format!("unknown comment status: {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub phone: String,
    pub gender: Option<String>,
    pub birth_date: Option<String>,
    pub bio: String,
    pub avatar: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<String>,
    pub profile_public: bool,
    pub is_verified: bool,
    pub is_premium: bool,
    pub is_active: bool,
    pub last_activity: Option<i64>,
    pub date_joined: i64,
}

impl UserRecord {
    /// Preferred human-readable name: full name when set, username otherwise.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub parent_id: Option<i64>,
    pub sort_order: i64,
    pub meta_description: String,
    pub meta_keywords: String,
    pub is_deleted: bool,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlogRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub category_id: i64,
    pub author_id: Option<i64>,
    pub description: String,
    pub excerpt: String,
    pub img: Option<String>,
    pub status: BlogStatus,
    pub views: i64,
    pub featured: bool,
    pub reading_time: i64,
    pub published_at: Option<i64>,
    pub meta_description: String,
    pub meta_keywords: String,
    pub is_deleted: bool,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl BlogRecord {
    /// Stored excerpt, or the first 200 characters of the stripped body
    /// plus an ellipsis when none was supplied.
    pub fn get_excerpt(&self) -> String {
        if !self.excerpt.is_empty() {
            return self.excerpt.clone();
        }
        crate::text::derive_excerpt(&self.description)
    }

    pub fn is_published(&self) -> bool {
        self.status == BlogStatus::Published && self.is_active
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub color: String,
    pub usage_count: i64,
    pub created_at: i64,
}

/// Lightweight tag reference carried on list items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRef {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentRecord {
    pub id: i64,
    pub blog_id: i64,
    pub user_id: i64,
    pub parent_id: Option<i64>,
    pub content: String,
    pub status: CommentStatus,
    pub name: String,
    pub email: String,
    pub edited: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LikeRecord {
    pub id: i64,
    pub user_id: i64,
    pub blog_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookmarkRecord {
    pub id: i64,
    pub user_id: i64,
    pub blog_id: i64,
    pub notes: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactMessageRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsletterRecord {
    pub id: i64,
    pub email: String,
    pub subscribed_at: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteInfoRecord {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub img: Option<String>,
    pub phone: String,
    pub email: String,
    pub x: Option<String>,
    pub instagram: Option<String>,
    pub telegram: Option<String>,
    pub github: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Projection the list/search endpoints work over: one row per blog with
/// the joined display fields and counters the filter helper needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlogListItem {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub description: String,
    pub category_title: String,
    pub category_slug: String,
    pub tags: Vec<TagRef>,
    pub author_username: Option<String>,
    pub author_full_name: Option<String>,
    pub meta_keywords: String,
    pub img: Option<String>,
    pub featured: bool,
    pub views: i64,
    pub like_count: i64,
    pub reading_time: i64,
    pub created_at: i64,
    pub published_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blog_status_round_trips() {
        for status in [BlogStatus::Draft, BlogStatus::Published, BlogStatus::Archived] {
            assert_eq!(BlogStatus::parse(status.as_str()).ok(), Some(status));
        }
        assert!(BlogStatus::parse("deleted").is_err());
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut user = sample_user();
        assert_eq!(user.display_name(), "Ada Lovelace");
        user.full_name = "  ".to_string();
        assert_eq!(user.display_name(), "ada");
    }

    fn sample_user() -> UserRecord {
        UserRecord {
            id: 1,
            email: "ada@example.com".to_string(),
            username: "ada".to_string(),
            full_name: "Ada Lovelace".to_string(),
            phone: String::new(),
            gender: None,
            birth_date: None,
            bio: String::new(),
            avatar: None,
            website: None,
            twitter: None,
            github: None,
            profile_public: true,
            is_verified: false,
            is_premium: false,
            is_active: true,
            last_activity: None,
            date_joined: 0,
        }
    }
}
