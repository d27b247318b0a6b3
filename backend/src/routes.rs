use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{handlers, request_context, state::AppState};

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let accounts = Router::new()
        .route("/register", post(handlers::accounts::register))
        .route("/login", post(handlers::accounts::login))
        .route("/logout", post(handlers::accounts::logout))
        .route("/profile", get(handlers::accounts::profile))
        .route("/profile", put(handlers::accounts::update_profile))
        .route("/password/change", post(handlers::accounts::change_password))
        .route("/email/change", post(handlers::accounts::change_email))
        .route("/deactivate", post(handlers::accounts::deactivate))
        .route("/api/toggle-privacy", post(handlers::accounts::toggle_privacy))
        .route("/api/update-activity", post(handlers::accounts::update_activity))
        .route("/api/stats", get(handlers::accounts::stats));

    let blog = Router::new()
        .route("/", get(handlers::blog::list))
        .route("/detail/:slug", get(handlers::blog::detail))
        .route("/create", post(handlers::blog::create))
        .route("/update/:slug", put(handlers::blog::update))
        .route("/delete/:slug", delete(handlers::blog::delete))
        .route("/categories", get(handlers::blog::categories))
        .route("/categories/:slug", get(handlers::blog::category_detail))
        .route("/tags/:slug", get(handlers::blog::tag_detail))
        .route("/:slug/comment", post(handlers::comments::create))
        .route("/comment/:id/reply", post(handlers::comments::reply))
        .route("/comment/:id", delete(handlers::comments::delete))
        .route("/:slug/like", post(handlers::engagement::toggle_like))
        .route("/:slug/bookmark", post(handlers::engagement::toggle_bookmark))
        .route(
            "/:slug/bookmark/notes",
            post(handlers::engagement::update_bookmark_notes),
        );

    let contact = Router::new()
        .route("/", post(handlers::contact::submit))
        .route("/newsletter", post(handlers::contact::newsletter));

    Router::new()
        .nest("/accounts", accounts)
        .nest("/blog", blog)
        .nest("/contact", contact)
        .route("/site-info", get(handlers::site::site_info))
        .layer(middleware::from_fn(request_context::request_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
