use backon::ExponentialBuilder;
use std::time::Duration;

use crate::error::MealwiseError;

pub const USER_AGENT: &str = concat!("mealwise/", env!("CARGO_PKG_VERSION"));

/// Retry policy shared by every outbound call.
pub fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(1))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(3)
        .with_jitter()
}

pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, MealwiseError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()?;
    Ok(client)
}
