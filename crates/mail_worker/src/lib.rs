pub mod domain;
pub mod graph;
pub mod http;
pub mod identity;
pub mod mail_worker;
pub mod mailer;

pub use domain::*;
pub use graph::*;
pub use http::http_client;
pub use identity::*;
pub use mail_worker::*;
pub use mailer::*;
