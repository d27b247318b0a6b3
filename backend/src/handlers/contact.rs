//! Contact form and newsletter subscription endpoints.

use axum::extract::State;
use axum::response::Json;
use modern_blog_shared::contact_store::{NewContactMessageInput, SubscribeOutcome};
use serde::{Deserialize, Serialize};

use crate::handlers::{error_response, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewsletterRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct NewsletterResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
}

pub async fn submit(
    State(state): State<AppState>,
    Json(input): Json<NewContactMessageInput>,
) -> ApiResult<ContactResponse> {
    let record = state
        .contact
        .create_message(input)
        .map_err(|err| error_response("contact submit", err))?;

    if let Some(notifier) = state.email.clone() {
        let message = record.clone();
        tokio::spawn(async move {
            if let Err(err) = notifier.send_admin_contact_notification(&message).await {
                tracing::warn!("failed to send contact notification: {err:#}");
            }
        });
    }

    Ok(Json(ContactResponse {
        success: true,
        message: "Thanks for reaching out. We will get back to you soon.".to_string(),
        id: record.id,
    }))
}

/// Duplicate subscriptions report `success: false` with a friendly message
/// rather than a validation error; the unique row is untouched either way.
pub async fn newsletter(
    State(state): State<AppState>,
    Json(request): Json<NewsletterRequest>,
) -> ApiResult<NewsletterResponse> {
    let outcome = state
        .contact
        .subscribe(&request.email)
        .map_err(|err| error_response("newsletter subscribe", err))?;

    let (success, message) = match outcome {
        SubscribeOutcome::Subscribed => (true, "Thanks for subscribing!"),
        SubscribeOutcome::Reactivated => (true, "Welcome back! Your subscription is active again."),
        SubscribeOutcome::AlreadySubscribed => (false, "You are already subscribed."),
    };
    Ok(Json(NewsletterResponse {
        success,
        message: message.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_state;

    #[tokio::test]
    async fn valid_contact_submission_persists_the_row() {
        let state = test_state();
        let Json(response) = submit(
            State(state.clone()),
            Json(NewContactMessageInput {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                subject: "Feedback".to_string(),
                message: "I enjoyed the latest post.".to_string(),
            }),
        )
        .await
        .expect("submit");
        assert!(response.success);

        let stored = state
            .contact
            .get_message(response.id)
            .expect("fetch")
            .expect("row exists");
        assert_eq!(stored.name, "Ada");
        assert_eq!(stored.subject, "Feedback");
        assert!(stored.created_at > 0);
    }

    #[tokio::test]
    async fn duplicate_newsletter_subscription_reports_already_subscribed() {
        let state = test_state();
        let request = || {
            Json(NewsletterRequest {
                email: "reader@example.com".to_string(),
            })
        };

        let Json(first) = newsletter(State(state.clone()), request())
            .await
            .expect("first");
        assert!(first.success);

        let Json(second) = newsletter(State(state), request()).await.expect("second");
        assert!(!second.success);
        assert_eq!(second.message, "You are already subscribed.");
    }
}
