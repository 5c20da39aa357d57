mod router;
mod server;
#[cfg(test)]
pub(crate) mod test_support;

pub use router::*;
pub use server::*;
