//! AWS SDK implementations of the migration collaborators

mod errors;
pub mod organizations;
pub mod rate_limit;
pub mod session;
pub mod sts;

pub use organizations::AwsDirectory;
pub use rate_limit::{RateLimitedDirectory, RequestPacer};
pub use session::load_profile;
pub use sts::StsCredentialBroker;
