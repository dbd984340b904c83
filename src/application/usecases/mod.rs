pub mod create_message;
pub mod list_sent_messages;
