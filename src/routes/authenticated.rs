use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Routes that require a validated session. Course-level access (enrolment) is
/// checked inside the listing pipeline, after authentication.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /course/resources?courseId=...
        // Read-only HTML listing of a course's resource-type modules.
        .route("/course/resources", get(handlers::get_course_resources))
}
