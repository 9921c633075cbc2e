//! HTTP middleware layers

pub mod cors;
pub mod logging;
