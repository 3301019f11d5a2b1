pub mod base;
pub mod block;
pub mod config;
pub mod event;

pub use base::Cache;
pub use config::Config;
pub use event::{Event, Events};
pub use stats::cache::RequestStatus;
