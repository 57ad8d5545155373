pub mod chatbot;
pub mod conversation;
