pub mod config;
pub mod db;
pub mod error;
pub mod grocery;
pub mod handlers;
pub mod http;
pub mod import;
pub mod llm;
pub mod middleware;
pub mod pinterest;
pub mod planner;
pub mod router;
pub mod types;

pub use error::MealwiseError;
