//! Typed projections and write models for every table the service touches.

pub mod application;
pub mod course;
pub mod job;
pub mod learning;
pub mod payment;
pub mod profile;
pub mod role;
