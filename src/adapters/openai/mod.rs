pub mod api;
pub mod client;

pub use client::{first_message, first_message_text, ChatClient};
