//! Route handlers for the HTTP API.

pub mod convert;
pub mod download;
pub mod files;
pub mod health;
pub mod tools;
pub mod tts;
