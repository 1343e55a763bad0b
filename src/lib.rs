//! Turnstile - Request Admission Control
//!
//! This crate implements per-caller, fixed-window rate limiting for HTTP
//! services. A process-local [`ratelimit::LimiterStore`] decides whether each
//! request is admitted, and [`http::AdmissionLayer`] applies that decision in
//! front of an axum router, answering over-limit callers with a 429 and a
//! `Retry-After` hint.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
