//! Blog endpoints: list/search, detail, authoring CRUD, categories, tags.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use modern_blog_shared::blog_store::{BlogUpdateInput, NewBlogInput};
use modern_blog_shared::comments_store::CommentNode;
use modern_blog_shared::models::{
    BlogListItem, BlogRecord, BlogStatus, CategoryRecord, TagRecord,
};
use modern_blog_shared::query::{filter_and_sort, BlogQueryParams};
use modern_blog_shared::Scope;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::handlers::{error_response, not_found, ApiResult, MessageResponse};
use crate::markdown;
use crate::state::AppState;

const RELATED_POSTS_LIMIT: usize = 3;

#[derive(Debug, Deserialize)]
pub struct CreateBlogRequest {
    pub title: String,
    pub category_id: i64,
    pub description: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub status: Option<BlogStatus>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub meta_keywords: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlogListResponse {
    pub success: bool,
    pub blogs: Vec<BlogListItem>,
    pub total: usize,
    pub query: String,
    pub sort: String,
}

#[derive(Debug, Serialize)]
pub struct BlogDetailResponse {
    pub success: bool,
    pub blog: BlogRecord,
    pub description_html: String,
    pub excerpt: String,
    pub category: CategoryRecord,
    pub tags: Vec<TagRecord>,
    pub like_count: i64,
    pub bookmark_count: i64,
    pub comment_count: i64,
    pub liked: bool,
    pub bookmarked: bool,
    pub comments: Vec<CommentNode>,
    pub related: Vec<BlogRecord>,
}

#[derive(Debug, Serialize)]
pub struct BlogResponse {
    pub success: bool,
    pub message: String,
    pub blog: BlogRecord,
}

#[derive(Debug, Serialize)]
pub struct CategoryInfo {
    #[serde(flatten)]
    pub category: CategoryRecord,
    pub blog_count: i64,
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub success: bool,
    pub categories: Vec<CategoryInfo>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct CategoryDetailResponse {
    pub success: bool,
    pub category: CategoryRecord,
    pub blog_count: i64,
    pub total_views: i64,
    pub blogs: Vec<BlogListItem>,
}

#[derive(Debug, Serialize)]
pub struct TagDetailResponse {
    pub success: bool,
    pub tag: TagRecord,
    pub blogs: Vec<BlogListItem>,
}

/// List and search share one endpoint: all filter axes are optional query
/// parameters over the published base set.
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<BlogQueryParams>,
) -> ApiResult<BlogListResponse> {
    let items = state
        .blogs
        .list_published()
        .map_err(|err| error_response("list blogs", err))?;
    let blogs = filter_and_sort(items, &params);

    Ok(Json(BlogListResponse {
        success: true,
        total: blogs.len(),
        blogs,
        query: params.q.unwrap_or_default(),
        sort: params.sort.unwrap_or_else(|| "newest".to_string()),
    }))
}

/// Published posts are public and count a view per read; drafts and
/// archived posts are only visible to their author, without counting.
pub async fn detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    viewer: Option<AuthUser>,
) -> ApiResult<BlogDetailResponse> {
    let mut blog = state
        .blogs
        .get_blog_by_slug(&slug, Scope::Active)
        .map_err(|err| error_response("fetch blog", err))?
        .ok_or_else(|| not_found("blog post"))?;

    let viewer_id = viewer.as_ref().map(|AuthUser(user)| user.id);
    if blog.status == BlogStatus::Published {
        state
            .engagement
            .increment_views(blog.id)
            .map_err(|err| error_response("increment views", err))?;
        blog.views += 1;
    } else if blog.author_id.is_none() || blog.author_id != viewer_id {
        return Err(not_found("blog post"));
    }

    let category = state
        .blogs
        .get_category(blog.category_id)
        .map_err(|err| error_response("fetch category", err))?
        .ok_or_else(|| not_found("category"))?;
    let tags = state
        .blogs
        .tags_for_blog(blog.id)
        .map_err(|err| error_response("fetch tags", err))?;
    let like_count = state
        .engagement
        .like_count(blog.id)
        .map_err(|err| error_response("like count", err))?;
    let bookmark_count = state
        .engagement
        .bookmark_count(blog.id)
        .map_err(|err| error_response("bookmark count", err))?;
    let comment_count = state
        .comments
        .count_for_blog(blog.id)
        .map_err(|err| error_response("comment count", err))?;
    let comments = state
        .comments
        .list_for_blog(blog.id)
        .map_err(|err| error_response("list comments", err))?;
    let related = state
        .blogs
        .related_posts(blog.id, RELATED_POSTS_LIMIT)
        .map_err(|err| error_response("related posts", err))?;

    let (liked, bookmarked) = match viewer_id {
        Some(user_id) => (
            state
                .engagement
                .user_has_liked(user_id, blog.id)
                .map_err(|err| error_response("liked check", err))?,
            state
                .engagement
                .user_has_bookmarked(user_id, blog.id)
                .map_err(|err| error_response("bookmarked check", err))?,
        ),
        None => (false, false),
    };

    Ok(Json(BlogDetailResponse {
        success: true,
        description_html: markdown::render_html(&blog.description),
        excerpt: blog.get_excerpt(),
        blog,
        category,
        tags,
        like_count,
        bookmark_count,
        comment_count,
        liked,
        bookmarked,
        comments,
        related,
    }))
}

pub async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<CreateBlogRequest>,
) -> ApiResult<BlogResponse> {
    let blog = state
        .blogs
        .create_blog(NewBlogInput {
            title: request.title,
            slug: request.slug,
            category_id: request.category_id,
            author_id: Some(user.id),
            description: request.description,
            excerpt: request.excerpt,
            img: request.img,
            status: request.status.unwrap_or(BlogStatus::Draft),
            featured: request.featured,
            tag_ids: request.tags,
            meta_description: request.meta_description,
            meta_keywords: request.meta_keywords,
        })
        .map_err(|err| error_response("create blog", err))?;

    tracing::info!("blog `{}` created by {}", blog.slug, user.username);
    Ok(Json(BlogResponse {
        success: true,
        message: "Your post has been created.".to_string(),
        blog,
    }))
}

pub async fn update(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(input): Json<BlogUpdateInput>,
) -> ApiResult<BlogResponse> {
    let blog = state
        .blogs
        .update_blog(user.id, &slug, input)
        .map_err(|err| error_response("update blog", err))?;
    Ok(Json(BlogResponse {
        success: true,
        message: "Your post has been updated.".to_string(),
        blog,
    }))
}

pub async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<MessageResponse> {
    state
        .blogs
        .soft_delete_blog(user.id, &slug)
        .map_err(|err| error_response("delete blog", err))?;
    tracing::info!("blog `{slug}` deleted by {}", user.username);
    Ok(MessageResponse::ok("Your post has been deleted."))
}

pub async fn categories(State(state): State<AppState>) -> ApiResult<CategoryListResponse> {
    let records = state
        .blogs
        .list_categories(Scope::Active)
        .map_err(|err| error_response("list categories", err))?;

    let mut categories = Vec::with_capacity(records.len());
    for category in records {
        let blog_count = state
            .blogs
            .category_blog_count(category.id)
            .map_err(|err| error_response("category blog count", err))?;
        categories.push(CategoryInfo {
            category,
            blog_count,
        });
    }

    Ok(Json(CategoryListResponse {
        success: true,
        total: categories.len(),
        categories,
    }))
}

pub async fn category_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<CategoryDetailResponse> {
    let category = state
        .blogs
        .get_category_by_slug(&slug, Scope::Active)
        .map_err(|err| error_response("fetch category", err))?
        .ok_or_else(|| not_found("category"))?;

    let blog_count = state
        .blogs
        .category_blog_count(category.id)
        .map_err(|err| error_response("category blog count", err))?;
    let total_views = state
        .blogs
        .category_total_views(category.id)
        .map_err(|err| error_response("category total views", err))?;

    let items = state
        .blogs
        .list_published()
        .map_err(|err| error_response("list blogs", err))?;
    let params = BlogQueryParams {
        category: Some(category.slug.clone()),
        ..Default::default()
    };
    let blogs = filter_and_sort(items, &params);

    Ok(Json(CategoryDetailResponse {
        success: true,
        category,
        blog_count,
        total_views,
        blogs,
    }))
}

pub async fn tag_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<TagDetailResponse> {
    let tag = state
        .blogs
        .get_tag_by_slug(&slug)
        .map_err(|err| error_response("fetch tag", err))?
        .ok_or_else(|| not_found("tag"))?;

    let items = state
        .blogs
        .list_published()
        .map_err(|err| error_response("list blogs", err))?;
    let params = BlogQueryParams {
        tag: Some(tag.slug.clone()),
        ..Default::default()
    };
    let blogs = filter_and_sort(items, &params);

    Ok(Json(TagDetailResponse {
        success: true,
        tag,
        blogs,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_state;
    use modern_blog_shared::blog_store::NewCategoryInput;

    fn seed_published_blog(state: &AppState) -> modern_blog_shared::models::BlogRecord {
        let category = state
            .blogs
            .create_category(NewCategoryInput {
                title: "Tech".to_string(),
                slug: Some("tech".to_string()),
                description: None,
                parent_id: None,
                sort_order: 0,
                meta_description: None,
                meta_keywords: None,
            })
            .expect("category");
        assert_eq!(category.slug, "tech");

        let body = format!("# Hello World\n\n{}", "lorem ipsum dolor sit amet ".repeat(12));
        state
            .blogs
            .create_blog(NewBlogInput {
                title: "Hello World Detail Test".to_string(),
                slug: None,
                category_id: category.id,
                author_id: None,
                description: body,
                excerpt: None,
                img: None,
                status: BlogStatus::Published,
                featured: false,
                tag_ids: Vec::new(),
                meta_description: None,
                meta_keywords: None,
            })
            .expect("blog")
    }

    #[tokio::test]
    async fn detail_counts_a_view_and_renders_markdown() {
        let state = test_state();
        let blog = seed_published_blog(&state);
        assert_eq!(blog.views, 0);

        let Json(response) = detail(State(state.clone()), Path(blog.slug.clone()), None)
            .await
            .expect("detail");
        assert!(response.success);
        assert_eq!(response.blog.views, 1);
        assert!(response.description_html.contains("<h1>Hello World</h1>"));
        assert!(response.excerpt.ends_with("..."));
        assert_eq!(response.excerpt.chars().count(), 203);

        let Json(again) = detail(State(state), Path(blog.slug), None)
            .await
            .expect("detail again");
        assert_eq!(again.blog.views, 2);
    }

    #[tokio::test]
    async fn drafts_are_hidden_from_strangers_but_not_their_author() {
        use crate::auth::AuthUser;
        use modern_blog_shared::accounts_store::NewUserInput;

        let state = test_state();
        let category = state
            .blogs
            .create_category(NewCategoryInput {
                title: "Tech Drafts".to_string(),
                slug: None,
                description: None,
                parent_id: None,
                sort_order: 0,
                meta_description: None,
                meta_keywords: None,
            })
            .expect("category");
        let (author, _) = state
            .accounts
            .register(
                NewUserInput {
                    email: "ada@example.com".to_string(),
                    username: "ada".to_string(),
                    password: "correct-horse".to_string(),
                    full_name: None,
                    phone: None,
                    gender: None,
                    birth_date: None,
                },
                false,
            )
            .expect("author");
        let draft = state
            .blogs
            .create_blog(NewBlogInput {
                title: "A Draft Nobody Should See".to_string(),
                slug: None,
                category_id: category.id,
                author_id: Some(author.id),
                description: "draft body ".repeat(12),
                excerpt: None,
                img: None,
                status: BlogStatus::Draft,
                featured: false,
                tag_ids: Vec::new(),
                meta_description: None,
                meta_keywords: None,
            })
            .expect("draft");

        let hidden = detail(State(state.clone()), Path(draft.slug.clone()), None).await;
        assert!(hidden.is_err());

        let Json(preview) = detail(
            State(state),
            Path(draft.slug),
            Some(AuthUser(author)),
        )
        .await
        .expect("author preview");
        assert_eq!(preview.blog.views, 0);
    }

    #[tokio::test]
    async fn list_filters_through_query_parameters() {
        let state = test_state();
        seed_published_blog(&state);

        let params = BlogQueryParams {
            q: Some("hello".to_string()),
            ..Default::default()
        };
        let Json(response) = list(State(state.clone()), Query(params))
            .await
            .expect("list");
        assert_eq!(response.total, 1);

        let params = BlogQueryParams {
            q: Some("no-such-term".to_string()),
            ..Default::default()
        };
        let Json(response) = list(State(state), Query(params)).await.expect("list");
        assert_eq!(response.total, 0);
    }
}
