//! A runtime layer that sits between an agent loop and its callable
//! tools: it keeps conversations within a model's token budget (C1-C4),
//! resolves per-field guidance from static configuration and dynamic
//! providers (C5-C6), synthesizes user-facing forms when a tool call
//! can't proceed as given (C7-C8), intercepts and resumes tool calls
//! around that form lifecycle (C9), and rewrites oversized tool
//! responses into lightweight references while formatting a few
//! well-known response shapes for display (C10).

pub mod chat;
pub mod config;
pub mod content_processor;
pub mod error;
pub mod executor;
pub mod field_types;
pub mod form;
pub mod form_engine;
pub mod form_generator;
pub mod guidance;
pub mod logging;
pub mod memory;
pub mod schema;
pub mod token_counter;
pub mod tool;

pub use error::{Error, ErrorKind, Result};
