//! HTTP handlers, grouped by resource.

pub mod restart;
pub mod service_config;
