pub mod chat;
pub mod sandbox;
