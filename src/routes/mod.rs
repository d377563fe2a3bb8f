/// Router Module Index
///
/// Routes are split by access level so authentication is applied per module
/// (via Axum layers) rather than per handler.

/// Routes accessible to anyone (health checks).
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
pub mod authenticated;
