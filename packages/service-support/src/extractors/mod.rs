pub mod current_user;
pub mod query;
pub mod validated_json;

pub use current_user::{CurrentUser, UserId};
pub use query::query_config;
pub use validated_json::ValidatedJson;
