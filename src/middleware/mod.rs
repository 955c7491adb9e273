//! Request extractors: caller session, role gates and the admin API key.

pub mod api_key;
pub mod auth;
pub mod rbac;
