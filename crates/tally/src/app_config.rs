//! 🔧 App Configuration, the sacred TOML-to-struct pipeline.
//!
//! 📡 "Bucket not found: We looked everywhere. Under the couch. Behind the fridge.
//! In us-west-2. Nothing." (it was in us-east-1) 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! Layers, lowest precedence first:
//! 1. `TALLY_*` environment variables (nested keys split on `__`)
//! 2. an optional TOML file
//! 3. [`ConfigOverrides`], usually straight from the command line

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, bail};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub use crate::backends::{InMemoryObject, InMemoryStorageConfig, S3StorageConfig};

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// 🪣 Where the objects live.
    #[serde(alias = "storage_config")]
    pub storage: StorageConfig,
    /// 🧵 How hard we lean on it.
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// 🎭 Which storage backend to tally. Externally tagged, so TOML reads as
/// `[storage.s3]` or `[storage.in_memory]`.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub enum StorageConfig {
    #[serde(alias = "S3")]
    S3(S3StorageConfig),
    #[serde(alias = "InMemory")]
    InMemory(InMemoryStorageConfig),
}

impl StorageConfig {
    /// 🏷️ Human label for logs and the summary, e.g. `s3://my-bucket/logs/`.
    pub fn label(&self) -> String {
        match self {
            StorageConfig::S3(s3) => format!("s3://{}/{}", s3.bucket, s3.prefix.as_deref().unwrap_or("")),
            StorageConfig::InMemory(mem) => {
                format!("mem://{}", mem.prefix.as_deref().unwrap_or(""))
            }
        }
    }
}

/// 🧵 Runtime knobs for the fetch pool.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// 👷 Number of concurrent fetch workers. Fixed for the whole run.
    #[serde(default = "default_worker_count", alias = "num_workers")]
    pub worker_count: usize,
    /// 📬 Keys allowed in flight between the lister and the workers.
    /// Once full, the lister waits. That's backpressure, baby.
    #[serde(default = "default_queue_capacity", alias = "channel_size")]
    pub queue_capacity: usize,
    /// ⏱️ Per-object budget for fetch + consume. `None` means wait forever,
    /// which is exactly as risky as it sounds.
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
    /// 📊 Draw a progress bar on stderr.
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

// -- 👷 100 workers. enough to keep a bucket busy, not enough to unionize.
fn default_worker_count() -> usize {
    100
}

// -- 📬 1000 keys in flight. a key is tiny, so this is mostly about not outrunning the workers.
fn default_queue_capacity() -> usize {
    1000
}

fn default_show_progress() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_capacity: default_queue_capacity(),
            fetch_timeout_secs: None,
            show_progress: default_show_progress(),
        }
    }
}

impl RuntimeConfig {
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    /// ✅ Reject configs that would deadlock or do nothing before we open a single socket.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runtime.worker_count == 0 {
            bail!("💀 runtime.worker_count must be at least 1. Zero workers drain nothing, forever.");
        }
        if self.runtime.queue_capacity == 0 {
            bail!("💀 runtime.queue_capacity must be at least 1. A zero-slot queue is just a wall.");
        }
        if self.runtime.fetch_timeout_secs == Some(0) {
            bail!("💀 runtime.fetch_timeout_secs must be positive. Leave it unset for no timeout.");
        }
        match &self.storage {
            StorageConfig::S3(s3) => s3.validate(),
            StorageConfig::InMemory(mem) => mem.validate(),
        }
    }

    /// 🎛️ Apply overrides to an already-loaded config.
    ///
    /// `bucket` and `region` only mean something to S3. On any other backend they
    /// are ignored, with a warning, and the ignored names are returned.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        match &mut self.storage {
            StorageConfig::S3(s3) => {
                if let Some(bucket) = &overrides.bucket {
                    s3.bucket = bucket.clone();
                }
                if let Some(region) = &overrides.region {
                    s3.region = region.clone();
                }
            }
            StorageConfig::InMemory(_) => {
                if overrides.bucket.is_some() {
                    ignored.push("bucket");
                }
                if overrides.region.is_some() {
                    ignored.push("region");
                }
            }
        }
        for name in &ignored {
            warn!(
                "⚠️ ignoring the '{}' override: it only applies to S3, and {} is not S3",
                name,
                self.storage.label()
            );
        }
        if let Some(prefix) = &overrides.prefix {
            match &mut self.storage {
                StorageConfig::S3(s3) => s3.prefix = Some(prefix.clone()),
                StorageConfig::InMemory(mem) => mem.prefix = Some(prefix.clone()),
            }
        }
        if let Some(worker_count) = overrides.worker_count {
            self.runtime.worker_count = worker_count;
        }
        if let Some(queue_capacity) = overrides.queue_capacity {
            self.runtime.queue_capacity = queue_capacity;
        }
        if let Some(fetch_timeout_secs) = overrides.fetch_timeout_secs {
            self.runtime.fetch_timeout_secs = Some(fetch_timeout_secs);
        }
        if let Some(show_progress) = overrides.show_progress {
            self.runtime.show_progress = show_progress;
        }
        ignored
    }
}

/// 🎛️ The top layer of the config cake. Every field is optional; `None` means
/// "whatever the file or environment said".
///
/// `bucket` and `region` only make sense for S3. If no file and no env var
/// named a backend at all, a `bucket` here is enough to conjure an S3 config.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
    pub region: Option<String>,
    pub worker_count: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub fetch_timeout_secs: Option<u64>,
    pub show_progress: Option<bool>,
}

// 🧅 Figment only merges what it can serialize, so overrides get a serde-shaped twin
// that mirrors AppConfig's layout. Absent fields are skipped, never written as nulls.
#[derive(Serialize, Default)]
struct OverrideLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    storage: Option<StorageOverrideLayer>,
    runtime: RuntimeOverrideLayer,
}

#[derive(Serialize)]
struct StorageOverrideLayer {
    s3: S3OverrideLayer,
}

#[derive(Serialize)]
struct S3OverrideLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<String>,
}

#[derive(Serialize, Default)]
struct RuntimeOverrideLayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    worker_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    queue_capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fetch_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    show_progress: Option<bool>,
}

impl ConfigOverrides {
    /// `with_storage` is false when the loaded layers already picked a non-S3
    /// backend; a conjured `[storage.s3]` table would only fight with it.
    fn to_layer(&self, with_storage: bool) -> OverrideLayer {
        let bucket = self.bucket.as_ref().filter(|_| with_storage);
        let storage = bucket.map(|bucket| StorageOverrideLayer {
            s3: S3OverrideLayer {
                bucket: Some(bucket.clone()),
                region: self.region.clone(),
            },
        });
        OverrideLayer {
            storage,
            runtime: RuntimeOverrideLayer {
                worker_count: self.worker_count,
                queue_capacity: self.queue_capacity,
                fetch_timeout_secs: self.fetch_timeout_secs,
                show_progress: self.show_progress,
            },
        }
    }
}

// -- every spelling serde accepts for an in-memory storage table
const IN_MEMORY_TABLES: [&str; 4] = [
    "storage.in_memory",
    "storage.InMemory",
    "storage_config.in_memory",
    "storage_config.InMemory",
];

/// 🚀 Load the config from env vars and an optional TOML file, then validate it.
///
/// 📐 DESIGN NOTE:
///   - `config_file_name` is None → env vars only. No file. No assumptions.
///   - `config_file_name` is Some → env vars + TOML file, merged. TOML wins on conflicts.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    load_config_with_overrides(config_file_name, &ConfigOverrides::default())
}

/// 🚀 Same as [`load_config`], with a final layer of overrides on top.
///
/// Overrides are merged inside figment (so a bare `--bucket` can stand in for a
/// missing `[storage.s3]` table) and then applied once more on the extracted
/// struct (so `--prefix`/`--region` land on whichever backend the file chose).
pub fn load_config_with_overrides(
    config_file_name: Option<&Path>,
    overrides: &ConfigOverrides,
) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    // 🏗️ env vars are the base layer, like a good sourdough starter
    let config = Figment::new().merge(Env::prefixed("TALLY_").split("__"));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let names_an_in_memory_bucket = IN_MEMORY_TABLES
        .iter()
        .any(|table| config.find_value(table).is_ok());
    let config = config.merge(Serialized::defaults(
        overrides.to_layer(!names_an_in_memory_bucket),
    ));

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (TALLY_*). \
             Is there a [storage.s3] table with a bucket in it?",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (TALLY_*). \
                 No file was provided, so at minimum pass a bucket."
            .to_string(),
    };

    let mut app_config: AppConfig = config.extract().context(context_msg)?;
    app_config.apply_overrides(overrides);
    app_config
        .validate()
        .context("💀 Configuration loaded, but it doesn't make sense. See cause below.")?;
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_config(contents: &str) -> tempfile::NamedTempFile {
        let mut the_file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 Failed to create temp config. The filesystem said 'new phone who dis'.");
        the_file
            .write_all(contents.as_bytes())
            .expect("💀 Failed to write temp config.");
        the_file
    }

    #[test]
    fn the_one_where_an_s3_config_loads_with_all_the_knobs() {
        let the_file = write_test_config(
            r#"
            [storage.s3]
            bucket = "dspm-s3-test-1"
            prefix = "logs/"
            region = "eu-west-1"

            [runtime]
            worker_count = 8
            queue_capacity = 16
            fetch_timeout_secs = 30
            show_progress = false
            "#,
        );

        let app_config = load_config(Some(the_file.path())).expect("💀 config should parse");

        match &app_config.storage {
            StorageConfig::S3(s3) => {
                assert_eq!(s3.bucket, "dspm-s3-test-1");
                assert_eq!(s3.prefix.as_deref(), Some("logs/"));
                assert_eq!(s3.region, "eu-west-1");
            }
            honestly_who_knows => panic!("💀 Expected S3 storage, got {:?}", honestly_who_knows),
        }
        assert_eq!(app_config.runtime.worker_count, 8);
        assert_eq!(app_config.runtime.queue_capacity, 16);
        assert_eq!(app_config.runtime.fetch_timeout(), Some(Duration::from_secs(30)));
        assert!(!app_config.runtime.show_progress);
    }

    #[test]
    fn the_one_where_runtime_defaults_show_up_uninvited_but_helpful() {
        let the_file = write_test_config(
            r#"
            [storage.S3]
            bucket = "b"
            "#,
        );

        let app_config = load_config(Some(the_file.path())).expect("💀 defaults should fill in");

        assert_eq!(app_config.runtime, RuntimeConfig::default());
        assert_eq!(app_config.runtime.worker_count, 100);
        assert_eq!(app_config.runtime.queue_capacity, 1000);
        assert_eq!(app_config.runtime.fetch_timeout(), None);
        match app_config.storage {
            StorageConfig::S3(s3) => {
                assert_eq!(s3.region, "us-east-1");
                assert!(s3.prefix.is_none());
            }
            other => panic!("💀 Expected S3 storage, got {:?}", other),
        }
    }

    #[test]
    fn the_one_where_runtime_accepts_its_former_stage_names() {
        let the_file = write_test_config(
            r#"
            [storage.s3]
            bucket = "b"

            [runtime]
            num_workers = 4
            channel_size = 12
            "#,
        );

        let app_config = load_config(Some(the_file.path())).expect("💀 aliases should parse");
        assert_eq!(app_config.runtime.worker_count, 4);
        assert_eq!(app_config.runtime.queue_capacity, 12);
    }

    #[test]
    fn the_one_where_command_line_flags_beat_the_file() {
        let the_file = write_test_config(
            r#"
            [storage.s3]
            bucket = "from-file"
            region = "us-west-2"

            [runtime]
            worker_count = 4
            "#,
        );
        let the_overrides = ConfigOverrides {
            bucket: Some("from-flag".to_string()),
            prefix: Some("2024/".to_string()),
            worker_count: Some(2),
            show_progress: Some(false),
            ..Default::default()
        };

        let app_config = load_config_with_overrides(Some(the_file.path()), &the_overrides)
            .expect("💀 overrides should merge");

        match &app_config.storage {
            StorageConfig::S3(s3) => {
                assert_eq!(s3.bucket, "from-flag");
                assert_eq!(s3.region, "us-west-2");
                assert_eq!(s3.prefix.as_deref(), Some("2024/"));
            }
            other => panic!("💀 Expected S3 storage, got {:?}", other),
        }
        assert_eq!(app_config.runtime.worker_count, 2);
        assert!(!app_config.runtime.show_progress);
        assert_eq!(app_config.storage.label(), "s3://from-flag/2024/");
    }

    #[test]
    fn the_one_where_a_bucket_flag_is_a_whole_config() {
        let the_overrides = ConfigOverrides {
            bucket: Some("flag-only".to_string()),
            ..Default::default()
        };

        let app_config = load_config_with_overrides(None, &the_overrides)
            .expect("💀 a bucket flag alone should be enough");

        match app_config.storage {
            StorageConfig::S3(s3) => assert_eq!(s3.bucket, "flag-only"),
            other => panic!("💀 Expected S3 storage, got {:?}", other),
        }
    }

    #[test]
    fn the_one_where_s3_flags_bounce_off_an_in_memory_bucket() {
        let the_file = write_test_config(
            r#"
            [storage.in_memory]
            objects = [{ key = "a", size = 1 }]
            "#,
        );
        let the_overrides = ConfigOverrides {
            bucket: Some("not-here".to_string()),
            region: Some("eu-west-1".to_string()),
            prefix: Some("a".to_string()),
            ..Default::default()
        };

        let mut app_config = load_config_with_overrides(Some(the_file.path()), &the_overrides)
            .expect("💀 S3-only flags must not break an in-memory config");
        assert_eq!(app_config.storage.label(), "mem://a");

        // -- applying again reports exactly what got ignored
        assert_eq!(app_config.apply_overrides(&the_overrides), vec!["bucket", "region"]);
        assert!(matches!(app_config.storage, StorageConfig::InMemory(_)));
    }

    #[test]
    fn the_one_where_s3_flags_are_not_ignored_on_s3() {
        let mut app_config = AppConfig {
            storage: StorageConfig::S3(S3StorageConfig {
                bucket: "b".to_string(),
                prefix: None,
                region: "us-east-1".to_string(),
                endpoint_url: None,
                force_path_style: false,
                access_key_id: None,
                secret_access_key: None,
            }),
            runtime: RuntimeConfig::default(),
        };
        let the_overrides = ConfigOverrides {
            region: Some("eu-west-1".to_string()),
            ..Default::default()
        };

        assert!(app_config.apply_overrides(&the_overrides).is_empty());
        match &app_config.storage {
            StorageConfig::S3(s3) => assert_eq!(s3.region, "eu-west-1"),
            other => panic!("💀 Expected S3 storage, got {:?}", other),
        }
    }

    #[test]
    fn the_one_where_zero_workers_get_turned_away_at_the_door() {
        let the_file = write_test_config(
            r#"
            [storage.s3]
            bucket = "b"

            [runtime]
            worker_count = 0
            "#,
        );

        let the_result = load_config(Some(the_file.path()));
        assert!(the_result.is_err(), "zero workers should not validate");
    }

    #[test]
    fn the_one_where_an_in_memory_bucket_is_configured_from_toml() {
        let the_file = write_test_config(
            r#"
            [storage.in_memory]
            page_size = 2
            objects = [
                { key = "a", size = 10 },
                { key = "b", size = 20 },
                { key = "c", size = 5 },
            ]
            "#,
        );

        let app_config = load_config(Some(the_file.path())).expect("💀 in-memory should parse");
        match app_config.storage {
            StorageConfig::InMemory(mem) => {
                assert_eq!(mem.page_size, 2);
                assert_eq!(mem.objects.len(), 3);
                assert_eq!(mem.objects[1].key, "b");
                assert_eq!(mem.objects[1].size, 20);
            }
            other => panic!("💀 Expected in-memory storage, got {:?}", other),
        }
    }

    #[test]
    fn the_one_where_the_toml_crate_and_figment_agree_on_reality() {
        let the_raw = r#"
            worker_count = 3
            fetch_timeout_secs = 5
        "#;
        let the_runtime: RuntimeConfig = toml::from_str(the_raw).expect("💀 toml should parse");
        assert_eq!(the_runtime.worker_count, 3);
        assert_eq!(the_runtime.queue_capacity, 1000);
        assert_eq!(the_runtime.fetch_timeout(), Some(Duration::from_secs(5)));
        assert!(the_runtime.show_progress);
    }
}
