mod access_token;
mod sendgrid_mailer;

pub use access_token::*;
pub use sendgrid_mailer::*;
