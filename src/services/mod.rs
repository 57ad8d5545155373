pub mod chatbot;
pub mod conversation;
pub mod uploads;
