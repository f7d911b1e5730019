//! CyberGuard conversation service
//!
//! A session-scoped chat assistant: user turns are persisted alongside
//! assistant replies, replies come from a two-tier provider chain (delegation
//! relay first, direct OpenRouter call second), and a token-gated admin
//! surface supports browsing, searching, and deleting stored conversations.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod telemetry;
