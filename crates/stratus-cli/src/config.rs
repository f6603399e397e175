use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stratus_provisioner::PollPolicy;

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratusConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    /// Falls back to the SDK's region chain when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub credentials: CredentialSource,
    #[serde(default)]
    pub polling: PollingConfig,
}

impl Default for StratusConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            region: None,
            credentials: CredentialSource::DefaultChain,
            polling: PollingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    Inline {
        access_key_id: String,
        secret_access_key: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        session_token: Option<String>,
    },
    Profile {
        profile_name: String,
    },
    #[default]
    DefaultChain,
}

/// Poll intervals and deadlines, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub stack_interval_secs: u64,
    pub stack_timeout_secs: u64,
    pub drift_interval_secs: u64,
    pub drift_timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            stack_interval_secs: PollPolicy::STACK_OPERATION.interval.as_secs(),
            stack_timeout_secs: PollPolicy::STACK_OPERATION.timeout.as_secs(),
            drift_interval_secs: PollPolicy::DRIFT_DETECTION.interval.as_secs(),
            drift_timeout_secs: PollPolicy::DRIFT_DETECTION.timeout.as_secs(),
        }
    }
}

impl PollingConfig {
    pub fn stack_policy(&self) -> PollPolicy {
        policy(self.stack_interval_secs, self.stack_timeout_secs)
    }

    pub fn drift_policy(&self) -> PollPolicy {
        policy(self.drift_interval_secs, self.drift_timeout_secs)
    }
}

fn policy(interval_secs: u64, timeout_secs: u64) -> PollPolicy {
    PollPolicy {
        // a zero period would make tokio's interval panic
        interval: Duration::from_secs(interval_secs.max(1)),
        timeout: Duration::from_secs(timeout_secs),
    }
}

/// Redacted config info safe to print.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigInfo {
    pub path: String,
    pub region: Option<String>,
    pub credential_type: String,
    pub profile_name: Option<String>,
    pub access_key_hint: Option<String>,
    pub polling: PollingConfig,
}

pub fn default_config_path() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("stratus").join("config.json"))
}

/// Load the config at `path`, or defaults when no file exists.
pub fn load_or_default(path: &Path) -> eyre::Result<StratusConfig> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(StratusConfig::default())
    }
}

pub fn load_config(path: &Path) -> eyre::Result<StratusConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let config: StratusConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update stratus."
        ));
    }

    // v0 → v1: version stamp only; every v1 field has a default
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1");
    }

    Ok(json)
}

pub fn save_config(path: &Path, config: &StratusConfig) -> eyre::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| eyre::eyre!("config path {} has no parent", path.display()))?;
    std::fs::create_dir_all(dir)?;

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let json = serde_json::to_string_pretty(&stamped)?;

    // Write to a temp file then rename for atomicity
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

/// Apply `--region` and `--profile` on top of the file.
pub fn with_overrides(
    mut config: StratusConfig,
    region: Option<&str>,
    profile: Option<&str>,
) -> StratusConfig {
    if let Some(region) = region {
        config.region = Some(region.to_string());
    }
    if let Some(profile) = profile {
        config.credentials = CredentialSource::Profile {
            profile_name: profile.to_string(),
        };
    }
    config
}

pub fn config_info(path: &Path, config: &StratusConfig) -> ConfigInfo {
    let (credential_type, profile_name, access_key_hint) = match &config.credentials {
        CredentialSource::Inline {
            access_key_id,
            session_token,
            ..
        } => {
            let cred_type = if session_token.is_some() {
                "temporary".to_string()
            } else {
                "inline".to_string()
            };
            (cred_type, None, Some(redact_access_key(access_key_id)))
        }
        CredentialSource::Profile { profile_name } => {
            ("profile".to_string(), Some(profile_name.clone()), None)
        }
        CredentialSource::DefaultChain => ("default_chain".to_string(), None, None),
    };

    ConfigInfo {
        path: path.display().to_string(),
        region: config.region.clone(),
        credential_type,
        profile_name,
        access_key_hint,
        polling: config.polling,
    }
}

fn redact_access_key(key: &str) -> String {
    if key.len() <= 8 || !key.is_ascii() {
        return "****".to_string();
    }
    let prefix = &key[..4];
    let suffix = &key[key.len() - 4..];
    format!("{prefix}...{suffix}")
}
