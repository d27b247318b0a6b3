//! Public site-info endpoint.

use axum::extract::State;
use axum::response::Json;
use modern_blog_shared::models::SiteInfoRecord;
use serde::Serialize;

use crate::handlers::{error_response, not_found, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SiteInfoResponse {
    pub success: bool,
    pub info: SiteInfoRecord,
}

pub async fn site_info(State(state): State<AppState>) -> ApiResult<SiteInfoResponse> {
    let info = state
        .site
        .get_info()
        .map_err(|err| error_response("site info", err))?
        .ok_or_else(|| not_found("site info"))?;
    Ok(Json(SiteInfoResponse {
        success: true,
        info,
    }))
}
