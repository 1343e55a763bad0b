//! HTTP admission control: identity extraction, middleware and server.

mod identity;
mod middleware;
mod response;
mod server;

pub use identity::{IdentitySource, X_FORWARDED_FOR};
pub use middleware::{AdmissionLayer, AdmissionService};
pub use response::{retry_after_secs, RateLimitExceeded};
pub use server::HttpServer;
