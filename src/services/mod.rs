//! Domain services
//!
//! Each service enforces the ownership and role rules for one resource and orchestrates the
//! repository calls behind it. Services are plain async functions over `&dyn Repository`, so
//! handlers and tests can drive them with any repository implementation.

pub mod comments;
pub mod follows;
pub mod likes;
pub mod posts;
pub mod users;
