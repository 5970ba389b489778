mod error;
mod types;
mod validation;

pub use error::ValidationError;
pub use types::{NewUser, User};
pub use validation::{parse_user_id, validate_name, MAX_NAME_LEN};
