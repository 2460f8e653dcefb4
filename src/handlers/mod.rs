// HTTP handlers, one module per resource under /api/v1.
//
// Reads are public except users; writes run behind the JWT middleware and
// check role, ownership and per-resource preconditions before touching the
// store.

pub mod auth;
pub mod bootcamps;
pub mod courses;
pub mod reviews;
pub mod users;
mod utils;
