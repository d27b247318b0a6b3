use std::path::Path;

use anyhow::Result;
use modern_blog_shared::accounts_store::{AccountsStore, NewUserInput};
use modern_blog_shared::blog_store::{BlogStore, NewBlogInput, NewCategoryInput, NewTagInput};
use modern_blog_shared::comments_store::{CommentsStore, NewCommentInput};
use modern_blog_shared::engagement_store::EngagementStore;
use modern_blog_shared::models::{BlogStatus, CommentStatus};
use modern_blog_shared::site_settings_store::{SiteInfoInput, SiteSettingsStore};
use modern_blog_shared::{Database, Scope};

const SEED_PASSWORD: &str = "sample-password";

struct SamplePost {
    title: &'static str,
    category: &'static str,
    author: &'static str,
    tags: &'static [&'static str],
    status: BlogStatus,
    featured: bool,
    body: &'static str,
}

const POSTS: &[SamplePost] = &[
    SamplePost {
        title: "Getting Comfortable With Ownership",
        category: "technology",
        author: "ada",
        tags: &["rust"],
        status: BlogStatus::Published,
        featured: true,
        body: "Ownership is the first wall most people hit when learning Rust, and also \
               the feature that pays for everything else. This post walks through the \
               borrow checker's rules with small, self-contained examples: moves, borrows, \
               lifetimes in struct fields, and the patterns that make the compiler agree \
               with you instead of fighting you. By the end the rules should feel less \
               like restrictions and more like a design tool you reach for on purpose.",
    },
    SamplePost {
        title: "A Sane Blogging Workflow In Markdown",
        category: "productivity",
        author: "ada",
        tags: &["writing", "tooling"],
        status: BlogStatus::Published,
        featured: false,
        body: "Drafts live in a plain directory, one Markdown file per idea. A tiny \
               script promotes a draft to the blog when it is ready, and everything is \
               version controlled so nothing is ever lost. Here is the whole setup, the \
               three conventions that keep it tidy, and the escape hatches for images \
               and code snippets.",
    },
    SamplePost {
        title: "Serving A Blog From One Binary",
        category: "technology",
        author: "grace",
        tags: &["rust", "web"],
        status: BlogStatus::Published,
        featured: false,
        body: "SQLite plus a single server binary covers a surprising amount of ground. \
               This post measures how far that setup goes: cold starts, concurrent \
               readers, and the point at which you actually need something bigger. \
               Spoiler: for a personal blog, that point is probably never.",
    },
    SamplePost {
        title: "What LLM Assistants Change About Writing",
        category: "ai-and-tools",
        author: "grace",
        tags: &["llm", "writing"],
        status: BlogStatus::Published,
        featured: false,
        body: "Drafting with an assistant is a different activity from drafting alone: \
               the bottleneck moves from producing sentences to judging them. Some notes \
               on what that does to voice, what it does to structure, and the editing \
               habits that keep a post sounding like you wrote it.",
    },
    SamplePost {
        title: "Unfinished Thoughts On Feed Readers",
        category: "ai-and-tools",
        author: "ada",
        tags: &["tooling"],
        status: BlogStatus::Draft,
        featured: false,
        body: "A draft collecting impressions of the current crop of feed readers and \
               what a modern one would need to win me back. Not published yet because \
               half of these opinions will change after another week of use.",
    },
];

/// Loads sample content. Keyed on emails and slugs, so running it again
/// leaves existing rows untouched.
pub fn run(db_path: &Path) -> Result<()> {
    let db = Database::open(db_path)?;
    let accounts = AccountsStore::new(db.clone());
    let blogs = BlogStore::new(db.clone());
    let comments = CommentsStore::new(db.clone());
    let engagement = EngagementStore::new(db.clone());
    let site = SiteSettingsStore::new(db);

    site.upsert_info(SiteInfoInput {
        name: "ModernBlog".to_string(),
        description: Some("Notes on software, writing and the tools in between.".to_string()),
        img: None,
        phone: None,
        email: Some("hello@modernblog.example".to_string()),
        x: Some("https://x.com/modernblog".to_string()),
        instagram: None,
        telegram: None,
        github: Some("https://github.com/modernblog".to_string()),
    })?;

    let ada = ensure_user(&accounts, "ada@example.com", "ada", "Ada Lovelace")?;
    let grace = ensure_user(&accounts, "grace@example.com", "grace", "Grace Hopper")?;

    ensure_category(&blogs, "Technology", "Building and running software.")?;
    ensure_category(&blogs, "Productivity", "Workflows, habits and small experiments.")?;
    ensure_category(&blogs, "AI And Tools", "Assistants, models and what to do with them.")?;

    for tag in ["rust", "web", "tooling", "writing", "llm"] {
        ensure_tag(&blogs, tag)?;
    }

    let mut created_posts = 0;
    for sample in POSTS {
        let slug = modern_blog_shared::text::slugify(sample.title);
        if blogs.get_blog_by_slug(&slug, Scope::All)?.is_some() {
            continue;
        }

        let category = blogs
            .get_category_by_slug(sample.category, Scope::Active)?
            .ok_or_else(|| anyhow::anyhow!("seed category `{}` missing", sample.category))?;
        let author = match sample.author {
            "ada" => ada,
            _ => grace,
        };
        let mut tag_ids = Vec::new();
        for tag in sample.tags {
            let tag = blogs
                .get_tag_by_slug(tag)?
                .ok_or_else(|| anyhow::anyhow!("seed tag `{tag}` missing"))?;
            tag_ids.push(tag.id);
        }

        let blog = blogs.create_blog(NewBlogInput {
            title: sample.title.to_string(),
            slug: None,
            category_id: category.id,
            author_id: Some(author),
            description: sample.body.to_string(),
            excerpt: None,
            img: None,
            status: sample.status,
            featured: sample.featured,
            tag_ids,
            meta_description: None,
            meta_keywords: None,
        })?;
        created_posts += 1;

        // Engagement samples only for freshly created posts, so reruns do
        // not toggle anything back off.
        if blog.status == BlogStatus::Published {
            let reader = if author == ada { grace } else { ada };
            engagement.toggle_like(reader, blog.id)?;
            if blog.featured {
                engagement.toggle_bookmark(reader, blog.id)?;
                let root = comments.create_comment(
                    NewCommentInput {
                        blog_id: blog.id,
                        user_id: reader,
                        content: "Great walkthrough, the borrow examples finally clicked."
                            .to_string(),
                        parent_id: None,
                        name: None,
                        email: None,
                    },
                    CommentStatus::Approved,
                )?;
                comments.create_comment(
                    NewCommentInput {
                        blog_id: blog.id,
                        user_id: author,
                        content: "Thanks! The struct-lifetime section took the longest."
                            .to_string(),
                        parent_id: Some(root.id),
                        name: None,
                        email: None,
                    },
                    CommentStatus::Approved,
                )?;
            }
        }
    }

    blogs.recount_tag_usage()?;
    tracing::info!("seed complete: {created_posts} new posts");
    Ok(())
}

fn ensure_user(
    accounts: &AccountsStore,
    email: &str,
    username: &str,
    full_name: &str,
) -> Result<i64> {
    if let Some(user) = accounts.get_user_by_username(username)? {
        return Ok(user.id);
    }
    let (user, _session) = accounts.register(
        NewUserInput {
            email: email.to_string(),
            username: username.to_string(),
            password: SEED_PASSWORD.to_string(),
            full_name: Some(full_name.to_string()),
            phone: None,
            gender: None,
            birth_date: None,
        },
        false,
    )?;
    Ok(user.id)
}

fn ensure_category(blogs: &BlogStore, title: &str, description: &str) -> Result<()> {
    let slug = modern_blog_shared::text::slugify(title);
    if blogs.get_category_by_slug(&slug, Scope::All)?.is_none() {
        blogs.create_category(NewCategoryInput {
            title: title.to_string(),
            slug: None,
            description: Some(description.to_string()),
            parent_id: None,
            sort_order: 0,
            meta_description: None,
            meta_keywords: None,
        })?;
    }
    Ok(())
}

fn ensure_tag(blogs: &BlogStore, name: &str) -> Result<()> {
    if blogs.get_tag_by_slug(name)?.is_none() {
        blogs.create_tag(NewTagInput {
            name: name.to_string(),
            slug: None,
            description: None,
            color: None,
        })?;
    }
    Ok(())
}
