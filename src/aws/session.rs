use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::debug;

use crate::config::AwsConfig;

/// Load shared SDK configuration for a named profile.
///
/// Transport retries (standard mode, exponential backoff with jitter) are
/// configured here and nowhere else.
pub async fn load_profile(profile: &str, settings: &AwsConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .profile_name(profile)
        .retry_config(RetryConfig::standard().with_max_attempts(settings.max_attempts));

    if let Some(region) = &settings.region {
        loader = loader.region(Region::new(region.clone()));
    }

    let sdk_config = loader.load().await;
    debug!(
        profile,
        region = ?sdk_config.region(),
        max_attempts = settings.max_attempts,
        "Loaded AWS profile"
    );
    sdk_config
}
