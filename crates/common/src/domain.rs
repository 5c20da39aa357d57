mod connector;
mod identity;
mod in_memory_key_value_store;
mod key_value_store;
mod mailer;
mod offer;
mod resolution;
mod result;
mod subgraph;

pub use connector::*;
pub use identity::*;
pub use in_memory_key_value_store::*;
pub use key_value_store::*;
pub use mailer::*;
pub use offer::*;
pub use resolution::*;
pub use result::*;
pub use subgraph::*;
