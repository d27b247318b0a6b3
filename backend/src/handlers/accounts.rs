//! Account endpoints: registration, sessions, profile and the small AJAX
//! helpers (privacy toggle, activity ping, stats).

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Json;
use modern_blog_shared::accounts_store::{NewUserInput, ProfileUpdateInput, UserStats};
use modern_blog_shared::models::{BlogRecord, UserRecord};
use serde::{Deserialize, Serialize};

use crate::auth::{bearer_token, AuthUser};
use crate::handlers::{error_response, unauthorized, ApiResult, MessageResponse};
use crate::state::AppState;

const PROFILE_RECENT_POSTS: usize = 6;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(flatten)]
    pub input: NewUserInput,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember: bool,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailChangeRequest {
    pub new_email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct DeactivateRequest {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub token: String,
    pub user: UserRecord,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserRecord,
    pub age: Option<i32>,
    pub stats: UserStats,
    pub posts: Vec<BlogRecord>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    pub user: UserRecord,
}

#[derive(Debug, Serialize)]
pub struct PrivacyResponse {
    pub success: bool,
    pub is_public: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: UserStats,
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<AuthResponse> {
    let (user, session) = state
        .accounts
        .register(request.input, request.remember)
        .map_err(|err| error_response("register", err))?;

    tracing::info!("new user registered: {}", user.email);
    if let Some(notifier) = state.email.clone() {
        let to = user.email.clone();
        let display_name = user.display_name().to_string();
        tokio::spawn(async move {
            if let Err(err) = notifier.send_welcome(&to, &display_name).await {
                tracing::warn!("failed to send welcome email to {to}: {err:#}");
            }
        });
    }

    Ok(Json(AuthResponse {
        success: true,
        message: format!("Welcome to ModernBlog, {}!", user.display_name()),
        token: session.token,
        user,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<AuthResponse> {
    let (user, session) = state
        .accounts
        .login(&request.email, &request.password, request.remember)
        .map_err(|err| error_response("login", err))?;

    tracing::info!("user {} logged in", user.email);
    Ok(Json(AuthResponse {
        success: true,
        message: format!("Welcome back, {}!", user.display_name()),
        token: session.token,
        user,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<MessageResponse> {
    let Some(token) = bearer_token(&headers) else {
        return Err(unauthorized());
    };
    state
        .accounts
        .logout(&token)
        .map_err(|err| error_response("logout", err))?;
    Ok(MessageResponse::ok("You have been logged out successfully."))
}

pub async fn profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> ApiResult<ProfileResponse> {
    state
        .accounts
        .touch_last_activity(user.id)
        .map_err(|err| error_response("touch last activity", err))?;
    let stats = state
        .accounts
        .user_stats(user.id)
        .map_err(|err| error_response("user stats", err))?;
    let mut posts = state
        .blogs
        .list_by_author(user.id)
        .map_err(|err| error_response("list own posts", err))?;
    posts.truncate(PROFILE_RECENT_POSTS);

    let age = user
        .birth_date
        .as_deref()
        .and_then(modern_blog_shared::text::parse_date)
        .map(calculate_age);

    Ok(Json(ProfileResponse {
        success: true,
        user,
        age,
        stats,
        posts,
    }))
}

pub async fn update_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<ProfileUpdateInput>,
) -> ApiResult<UserResponse> {
    let user = state
        .accounts
        .update_profile(user.id, input)
        .map_err(|err| error_response("update profile", err))?;
    Ok(Json(UserResponse {
        success: true,
        message: "Your profile has been updated successfully.".to_string(),
        user,
    }))
}

pub async fn change_password(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<PasswordChangeRequest>,
) -> ApiResult<MessageResponse> {
    state
        .accounts
        .change_password(user.id, &request.old_password, &request.new_password)
        .map_err(|err| error_response("change password", err))?;
    tracing::info!("password changed for user {}", user.email);
    Ok(MessageResponse::ok("Your password has been changed successfully."))
}

pub async fn change_email(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<EmailChangeRequest>,
) -> ApiResult<MessageResponse> {
    state
        .accounts
        .change_email(user.id, &request.new_email, &request.password)
        .map_err(|err| error_response("change email", err))?;
    tracing::info!("email changed for user {} to {}", user.email, request.new_email);
    Ok(MessageResponse::ok(format!(
        "Your email address has been changed from {} to {}.",
        user.email,
        request.new_email.trim().to_lowercase()
    )))
}

pub async fn deactivate(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(request): Json<DeactivateRequest>,
) -> ApiResult<MessageResponse> {
    if !request.confirm {
        return Err(error_response(
            "deactivate",
            modern_blog_shared::StoreError::invalid(
                "confirm",
                "please confirm that you want to deactivate your account",
            ),
        ));
    }
    state
        .accounts
        .deactivate(user.id)
        .map_err(|err| error_response("deactivate", err))?;
    tracing::info!("account deactivated for user {}", user.email);
    Ok(MessageResponse::ok("Your account has been deactivated successfully."))
}

pub async fn toggle_privacy(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> ApiResult<PrivacyResponse> {
    let is_public = state
        .accounts
        .toggle_profile_privacy(user.id)
        .map_err(|err| error_response("toggle privacy", err))?;
    let status = if is_public { "public" } else { "private" };
    Ok(Json(PrivacyResponse {
        success: true,
        is_public,
        message: format!("Your profile is now {status}."),
    }))
}

pub async fn update_activity(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> ApiResult<MessageResponse> {
    state
        .accounts
        .touch_last_activity(user.id)
        .map_err(|err| error_response("update activity", err))?;
    Ok(MessageResponse::ok("Activity updated."))
}

pub async fn stats(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> ApiResult<StatsResponse> {
    let stats = state
        .accounts
        .user_stats(user.id)
        .map_err(|err| error_response("user stats", err))?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}

fn calculate_age(birth_date: chrono::NaiveDate) -> i32 {
    use chrono::Datelike;
    let today = chrono::Utc::now().date_naive();
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_state;
    use axum::http::StatusCode;
    use chrono::{Datelike, Utc};

    #[test]
    fn age_counts_completed_years_only() {
        let today = Utc::now().date_naive();
        let twenty_years_ago = today.with_year(today.year() - 20).expect("valid date");
        assert_eq!(calculate_age(twenty_years_ago), 20);
    }

    fn register_request(email: &str, username: &str) -> RegisterRequest {
        RegisterRequest {
            input: NewUserInput {
                email: email.to_string(),
                username: username.to_string(),
                password: "correct-horse".to_string(),
                full_name: None,
                phone: None,
                gender: None,
                birth_date: None,
            },
            remember: false,
        }
    }

    #[tokio::test]
    async fn duplicate_email_registration_leaves_no_new_user() {
        let state = test_state();
        let Json(first) = register(
            State(state.clone()),
            Json(register_request("ada@example.com", "ada")),
        )
        .await
        .expect("first register");
        assert!(first.success);

        let (status, Json(body)) = register(
            State(state.clone()),
            Json(register_request("ada@example.com", "other")),
        )
        .await
        .expect_err("duplicate email");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.errors.expect("field errors").contains_key("email"));

        assert!(state
            .accounts
            .get_user_by_username("other")
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn login_issues_a_token_that_profile_accepts() {
        let state = test_state();
        register(
            State(state.clone()),
            Json(register_request("ada@example.com", "ada")),
        )
        .await
        .expect("register");

        let Json(login_response) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ada@example.com".to_string(),
                password: "correct-horse".to_string(),
                remember: false,
            }),
        )
        .await
        .expect("login");

        let user = state
            .accounts
            .user_for_token(&login_response.token)
            .expect("resolve")
            .expect("valid token");
        let Json(profile_response) = profile(AuthUser(user), State(state)).await.expect("profile");
        assert_eq!(profile_response.user.username, "ada");
        assert_eq!(profile_response.stats.posts_count, 0);
    }
}
