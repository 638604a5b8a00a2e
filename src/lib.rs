pub mod bot;
pub mod chat_log;
pub mod commands;
pub mod config;
pub mod entitlement;
pub mod media;
pub mod whatsapp;

#[cfg(test)]
mod http_stub;
