mod backend_client;
mod odoo_client;

pub use backend_client::*;
pub use odoo_client::*;
