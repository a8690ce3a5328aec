pub mod attachment;
pub mod chat;
pub mod events;
pub mod settings;
