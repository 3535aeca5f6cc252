//! Weekly dinner planning: cache reuse, LLM generation and per-meal feedback.

pub mod service;
pub mod week;

pub use service::Planner;
pub use week::{assign_days, week_start_of};
