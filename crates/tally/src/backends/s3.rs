//! 🪣☁️ S3 Backend, the cloud-to-ground data paratrooper.
//!
//! INT. AWS CONSOLE. NIGHT. A lone bucket sits in us-east-1, bloated with
//! objects. Someone typed `PUT` once and walked away. The data has been waiting.
//!
//! 🧠 Knowledge graph:
//! - Config co-located: `S3StorageConfig` lives in `s3_config.rs`
//! - Client: `aws-config` defaults + region + optional static creds/endpoint, retries off
//! - Listing: `ListObjectsV2` + continuation token → `S3Lister`
//! - Fetching: `GetObject` → `ByteStream::into_async_read()` → `S3Fetcher`

mod s3_config;
mod s3_fetcher;
mod s3_lister;

pub use s3_config::S3StorageConfig;
pub(crate) use s3_fetcher::S3Fetcher;
pub(crate) use s3_lister::S3Lister;

use anyhow::{Context, Result};
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;
use tracing::{debug, info};

/// 🚀 Build an S3 client from config and prove we actually have credentials.
///
/// Credential resolution normally happens lazily on the first request. We force it
/// here so a missing credential is a loud setup failure instead of a thousand
/// identical per-object warnings.
pub(crate) async fn connect(config: &S3StorageConfig) -> Result<aws_sdk_s3::Client> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        // -- no retries. a failed call fails, and we say so.
        .retry_config(RetryConfig::disabled());

    if let (Some(access_key_id), Some(secret_access_key)) =
        (&config.access_key_id, &config.secret_access_key)
    {
        debug!("🔑 using static credentials from configuration");
        loader = loader.credentials_provider(Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "tally-config",
        ));
    }

    if let Some(endpoint_url) = &config.endpoint_url {
        debug!("📡 using custom S3 endpoint {}", endpoint_url);
        loader = loader.endpoint_url(endpoint_url);
    }

    let sdk_config = loader.load().await;

    let credentials_provider = sdk_config.credentials_provider().context(
        "💀 No AWS credentials provider could be configured. \
         Set AWS_ACCESS_KEY_ID/AWS_SECRET_ACCESS_KEY, AWS_PROFILE, or static keys in [storage.s3].",
    )?;
    credentials_provider
        .provide_credentials()
        .await
        .context("💀 Failed to resolve AWS credentials. The keys are not under the doormat.")?;
    info!(
        "🔑 credentials resolved for s3://{} in {}",
        config.bucket, config.region
    );

    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(config.force_path_style)
        .build();

    Ok(aws_sdk_s3::Client::from_conf(s3_config))
}
