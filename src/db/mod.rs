pub mod filter;
pub mod messages;
pub mod models;
pub mod tokens;
pub mod users;

pub use filter::{ConversationScope, MessageFilter};
pub use messages::MessageRepository;
pub use models::{Message, MessageRow, User};
pub use tokens::TokenRepository;
pub use users::UserRepository;

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
