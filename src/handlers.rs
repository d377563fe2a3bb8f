use crate::{AppState, auth::AuthUser, error::ListingError, render};
use axum::{
    extract::{Query, State},
    response::Html,
};
use serde::Deserialize;

// --- Query Structs ---

/// ResourcesQuery
///
/// Query parameters of the listing page. The id is kept as raw text so a malformed
/// value becomes a `Validation` error instead of an extractor rejection.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ResourcesQuery {
    /// Course id.
    #[serde(rename = "courseId")]
    pub course_id: Option<String>,
    /// Legacy spelling of `courseId`, used when `courseId` is absent.
    pub id: Option<String>,
}

/// parse_course_id
///
/// Accepts a positive integer only.
pub fn parse_course_id(raw: Option<&str>) -> Result<i64, ListingError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ListingError::Validation("missing courseId".to_string()))?;
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ListingError::Validation(format!("malformed courseId: {raw}"))),
    }
}

// --- Handlers ---

/// get_course_resources
///
/// [Authenticated Route] Lists every resource-type module of a course the caller may
/// see, grouped by section or ordered by modification time, as an HTML page.
#[utoipa::path(
    get,
    path = "/course/resources",
    params(ResourcesQuery),
    responses(
        (status = 200, description = "Resource listing or empty-state notice", content_type = "text/html", body = String),
        (status = 400, description = "Missing or malformed courseId"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not enrolled in the course"),
        (status = 404, description = "Course not found")
    )
)]
pub async fn get_course_resources(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ResourcesQuery>,
) -> Result<Html<String>, ListingError> {
    let course_id = parse_course_id(query.course_id.as_deref().or(query.id.as_deref()))?;
    let page = state.listing.build_listing(course_id, &user).await?;
    Ok(Html(render::render_page(
        &page,
        state.listing.strings(),
        state.listing.wwwroot(),
    )))
}
