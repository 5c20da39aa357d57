mod client;
mod key_value_store;

pub use client::*;
pub use key_value_store::*;
