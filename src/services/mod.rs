//! Business logic services.

pub mod admin;
pub mod application;
pub mod auth;
pub mod course;
pub mod dashboard;
pub mod employer;
pub mod jobs;
pub mod learning;
pub mod roles;
pub mod sequencing;
pub mod stitch;
