//! Foreman: a multi-agent trading research orchestration demo.
//!
//! A Project Manager drives five role-flavored LLM agents through a
//! JSON-file-backed task backlog. Agents think via an OpenAI-compatible
//! chat API, act through a sandboxed workspace tool belt, and share
//! knowledge through JSON side-channel stores.
//!
//! Layering:
//! - [`domain`]: models, errors, and port traits
//! - [`infrastructure`]: configuration and logging
//! - [`adapters`]: LLM backends, JSON stores, Telegram, HTTP status API
//! - [`services`]: command parsing, routing, scheduling helpers
//! - [`application`]: the agent loop and the orchestrator
//! - [`cli`]: clap command surface

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;
