//! Translation service client for deck translation.
//!
//! Wraps a remote translation backend behind [`deck_core::Translator`],
//! with rate limiting and a fail-open policy: any unusable answer from the
//! service leaves the source text in place.

pub mod chat;
pub mod client;
pub mod config;
pub mod google;

pub use chat::{extract_translation, ChatBackend};
pub use client::{Backend, Outcome, TranslationClient};
pub use config::{BackendKind, ClientConfig};
pub use google::GoogleBackend;
