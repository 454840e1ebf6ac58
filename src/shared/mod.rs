pub mod ids;
pub mod logging;
pub mod message_split;
pub mod time;

pub use ids::JobId;
pub use logging::{LogLevel, RuntimeLog};
pub use message_split::{split_message, DEFAULT_MAX_MESSAGE_CHARS};
pub use time::now_millis;
