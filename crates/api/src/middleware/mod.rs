//! Authentication and request-tracking middleware.
//!
//! - [`auth::AdminToken`] -- guards the restart admin surface behind a static bearer token.
//! - [`track::track_requests`] -- drain-aware request tracking with a 503 gate while restarting.

pub mod auth;
pub mod track;
