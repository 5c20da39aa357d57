mod clock;
mod cursor_tracker;
mod deferred_writes;
mod dependency_monitor;
mod email_directory;
mod email_templates;
mod failure_ledger;
mod health_reporter;
mod notification_kind;
mod notification_service;

pub use clock::*;
pub use cursor_tracker::*;
pub use deferred_writes::*;
pub use dependency_monitor::*;
pub use email_directory::*;
pub use email_templates::*;
pub use failure_ledger::*;
pub use health_reporter::*;
pub use notification_kind::*;
pub use notification_service::*;
