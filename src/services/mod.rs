//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business rules and persistence so route handlers can
//! stay focused on request parsing, auth plumbing, and redirects.

pub mod account;
pub mod comment;
pub mod follow;
pub mod group;
pub mod media;
pub mod post;
pub mod session;

#[cfg(all(test, feature = "live-db-tests"))]
pub mod test_db;
