//! Fixed-window rate limiting state and decisions.

mod counter;
mod identity;
mod limiter;
mod sweeper;

pub use counter::WindowCounter;
pub use identity::Identity;
pub use limiter::{Decision, LimiterConfig, LimiterStore};
pub use sweeper::{spawn_sweeper, SweeperHandle};
