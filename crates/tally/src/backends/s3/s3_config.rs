//! 🔧 S3StorageConfig: knobs, dials, and one bucket name.

use anyhow::{Result, bail};
use serde::Deserialize;

/// 🔧 Configuration for the S3 storage backend.
///
/// 📐 `bucket` is required. Everything else has a default or is optional.
/// `access_key_id` and `secret_access_key` come as a pair or not at all; when
/// absent, the SDK's default chain (env vars, profile, IAM role, hope) decides.
#[derive(Deserialize, Clone)]
pub struct S3StorageConfig {
    /// 🪣 The bucket to tally.
    pub bucket: String,
    /// 🔍 Only keys starting with this prefix are listed.
    #[serde(default)]
    pub prefix: Option<String>,
    /// 🌎 AWS region. Defaults to us-east-1, the Florida of AWS regions.
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// 📡 Custom endpoint for S3-compatible stores (MinIO, R2, a mock server...).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// 🛣️ `http://host/bucket/key` instead of `http://bucket.host/key`.
    #[serde(default)]
    pub force_path_style: bool,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

// 🔒 hand-rolled so the secret never ends up in a log line
impl std::fmt::Debug for S3StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3StorageConfig")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl S3StorageConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.bucket.trim().is_empty() {
            bail!("💀 storage.s3.bucket is empty. We can't count a bucket with no name.");
        }
        if self.region.trim().is_empty() {
            bail!("💀 storage.s3.region is empty.");
        }
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            bail!(
                "💀 storage.s3.access_key_id and storage.s3.secret_access_key must be set together. \
                 Half a key opens half a door, which is no door."
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(bucket: &str) -> S3StorageConfig {
        toml::from_str(&format!("bucket = \"{bucket}\"")).expect("💀 minimal config should parse")
    }

    #[test]
    fn the_one_where_region_defaults_to_the_florida_of_aws() {
        let the_config = minimal("some-bucket");
        assert_eq!(the_config.region, "us-east-1");
        assert!(!the_config.force_path_style);
        assert!(the_config.endpoint_url.is_none());
        assert!(the_config.validate().is_ok());
    }

    #[test]
    fn the_one_where_a_blank_bucket_is_rejected() {
        assert!(minimal("   ").validate().is_err());
    }

    #[test]
    fn the_one_where_half_a_key_pair_is_rejected() {
        let mut the_config = minimal("b");
        the_config.access_key_id = Some("AKID".to_string());
        assert!(the_config.validate().is_err());

        the_config.secret_access_key = Some("secret".to_string());
        assert!(the_config.validate().is_ok());
    }

    #[test]
    fn the_one_where_debug_output_keeps_a_secret() {
        let mut the_config = minimal("b");
        the_config.access_key_id = Some("AKID".to_string());
        the_config.secret_access_key = Some("hunter2".to_string());

        let the_debug = format!("{:?}", the_config);
        assert!(!the_debug.contains("hunter2"));
        assert!(the_debug.contains("<redacted>"));
    }
}
