//! Assist Chat: session coordinator for node-error assistant conversations.

pub mod chat;
pub mod config;
pub mod error;
pub mod settings;
pub mod transport;
pub mod workflow;
