//! ABOUTME: Middleware modules for request authentication and metrics

pub mod auth;
pub mod metrics;
