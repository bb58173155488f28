mod email;
mod practice_name;

pub use email::validate_email;
pub use practice_name::{sanitize, validate_practice_name, PRACTICE_NAME_MAX};
