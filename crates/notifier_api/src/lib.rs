pub mod http;
pub mod notifier_api;

pub use http::*;
pub use notifier_api::*;
