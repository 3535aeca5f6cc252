//! Pinterest account linking (OAuth 2) and board/pin browsing.

pub mod endpoints;
pub mod service;
pub mod types;

pub use service::PinterestService;
pub use types::{Board, Page, PinSummary};
