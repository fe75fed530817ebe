//! # IO Module
//!
//! Adapter between HTTP clients and the domain services. Only the REST API
//! lives here today.

pub mod rest;

pub use rest::{api_router, ApiError};
