/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use crate::config_error::ConfigError;
use common_log::config::LogConfig;
use config_manager::ConfigSingleton;
use connector::{Adapters, AttestArgs, ConnectorConfig, TokenSigningAlg, MAX_POLICY_IDS};
use log::{debug, info};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tpm_attester::{
    parse_pcr_selections, with_ak_handle, with_device_type, with_owner_auth, with_pcr_selections, TpmAdapterOption,
    TpmDeviceType, AK_HANDLE_RANGE,
};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const CONFIG_FILE_NAME: &str = "client_config.yaml";
const SYSTEM_CONFIG_PATH: &str = "/etc/attestation_client/client_config.yaml";

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

// Verification service endpoints
#[derive(Debug, Deserialize, Clone, Validate)]
pub struct TrustAuthorityConfig {
    #[validate(url)]
    pub base_url: String,
    #[validate(url)]
    pub api_url: Option<String>, // Defaults to base_url
    #[validate(length(min = 1))]
    pub api_key: String,
    pub ca_path: Option<String>, // Extra root certificate, PEM
    #[serde(default = "default_request_timeout")]
    #[validate(range(min = 1))]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TpmConfig {
    pub device_type: Option<String>,
    pub ak_handle: Option<u32>,
    pub pcr_selections: Option<String>, // e.g. "sha256:0,1,7+sha1:0"
    #[serde(default)]
    pub owner_auth: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AttestConfig {
    pub token_signing_alg: Option<String>,
    #[serde(default)]
    pub policy_ids: Vec<Uuid>,
    #[serde(default)]
    pub policy_must_match: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub trust_authority: TrustAuthorityConfig,
    pub tpm: Option<TpmConfig>,
    #[serde(default)]
    pub attest: AttestConfig,
    pub logging: Option<LogConfig>,
}

impl Config {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Validate trust authority endpoints
        Validate::validate(&self.trust_authority)
            .map_err(|e| ConfigError::Validation(format!("trust_authority: {}", e)))?;

        // 2. Validate TPM configuration
        if let Some(tpm) = &self.tpm {
            self.validate_tpm(tpm)?;
        }

        // 3. Validate attestation defaults
        if let Some(alg) = &self.attest.token_signing_alg {
            alg.parse::<TokenSigningAlg>().map_err(|e| ConfigError::Validation(e.to_string()))?;
        }
        if self.attest.policy_ids.len() > MAX_POLICY_IDS {
            return Err(ConfigError::Validation(format!(
                "policy_ids exceeds the limit of {} (current: {})",
                MAX_POLICY_IDS,
                self.attest.policy_ids.len()
            )));
        }

        Ok(())
    }

    fn validate_tpm(&self, tpm: &TpmConfig) -> Result<(), ConfigError> {
        if let Some(device_type) = &tpm.device_type {
            device_type.parse::<TpmDeviceType>().map_err(|e| ConfigError::Validation(e.to_string()))?;
        }
        if let Some(handle) = tpm.ak_handle {
            if !AK_HANDLE_RANGE.contains(&handle) {
                return Err(ConfigError::Validation(format!(
                    "AK handle value 0x{:x} outside valid range (0x{:x}-0x{:x})",
                    handle,
                    AK_HANDLE_RANGE.start(),
                    AK_HANDLE_RANGE.end()
                )));
            }
        }
        if let Some(selections) = &tpm.pcr_selections {
            parse_pcr_selections(selections).map_err(|e| ConfigError::Validation(e.to_string()))?;
        }
        Ok(())
    }

    /// Connector settings, reading the CA certificate if one is configured.
    pub fn connector_config(&self) -> Result<ConnectorConfig, ConfigError> {
        let trust_authority = &self.trust_authority;
        let ca_cert_pem = match &trust_authority.ca_path {
            Some(path) => Some(
                std::fs::read(path)
                    .map_err(|e| ConfigError::Load(format!("Failed to read CA certificate {}: {}", path, e)))?,
            ),
            None => None,
        };

        let mut config = ConnectorConfig::new()
            .with_base_url(trust_authority.base_url.clone())
            .with_api_key(trust_authority.api_key.clone())
            .with_ca_cert_pem(ca_cert_pem)
            .with_timeout(Duration::from_secs(trust_authority.request_timeout_secs));
        if let Some(api_url) = &trust_authority.api_url {
            config = config.with_api_url(api_url.clone());
        }
        Ok(config)
    }

    /// TPM adapter options for the configured values; unset values keep the adapter defaults.
    pub fn tpm_adapter_options(&self) -> Result<Vec<TpmAdapterOption>, ConfigError> {
        let mut options = Vec::new();
        let Some(tpm) = &self.tpm else {
            return Ok(options);
        };
        if let Some(device_type) = &tpm.device_type {
            let device_type = device_type.parse::<TpmDeviceType>().map_err(|e| ConfigError::Validation(e.to_string()))?;
            options.push(with_device_type(device_type));
        }
        if let Some(handle) = tpm.ak_handle {
            options.push(with_ak_handle(handle));
        }
        if let Some(selections) = &tpm.pcr_selections {
            let selections = parse_pcr_selections(selections).map_err(|e| ConfigError::Validation(e.to_string()))?;
            options.push(with_pcr_selections(selections));
        }
        if !tpm.owner_auth.is_empty() {
            options.push(with_owner_auth(tpm.owner_auth.clone()));
        }
        Ok(options)
    }

    /// Initialise the log4rs backend from the `logging` section, if present.
    pub fn init_logging(&self) -> Result<(), ConfigError> {
        match &self.logging {
            Some(logging) => common_log::init_with_config(logging.clone())
                .map_err(|e| ConfigError::Load(format!("Failed to initialize logger: {}", e))),
            None => Ok(()),
        }
    }

    /// Attestation arguments carrying the configured token and policy settings.
    pub fn attest_args(&self, adapters: Adapters) -> Result<AttestArgs, ConfigError> {
        let mut args =
            AttestArgs::new(adapters).with_policy_ids(self.attest.policy_ids.clone(), self.attest.policy_must_match);
        if let Some(alg) = &self.attest.token_signing_alg {
            args = args.with_token_signing_alg(alg.parse().map_err(|e: connector::ConnectorError| {
                ConfigError::Validation(e.to_string())
            })?);
        }
        Ok(args)
    }
}

/// Process-wide client configuration
///
/// The configuration file is loaded using the following priority order:
/// 1. Explicitly specified path (if provided and the file exists)
/// 2. Current working directory: ./client_config.yaml
/// 3. System-wide configuration: /etc/attestation_client/client_config.yaml
pub static CLIENT_CONFIG: ConfigSingleton<Config> = ConfigSingleton::new();

#[derive(Clone)]
pub struct ConfigManager {
    config_path: String, // Records the actual configuration file path used
}

impl ConfigManager {
    pub fn new(config_path: &str) -> Result<Self, ConfigError> {
        let actual_path = Self::find_config_path(config_path)?;
        debug!("Loading client configuration from {}", actual_path);

        CLIENT_CONFIG
            .initialize_with(&actual_path, |config| config.validate().map_err(|e| e.to_string()))
            .map_err(ConfigError::Load)?;

        info!("Client configuration loaded from {}", actual_path);
        Ok(Self { config_path: actual_path })
    }

    pub fn find_config_path(explicit_path: &str) -> Result<String, ConfigError> {
        // 1. Check explicitly specified path
        if !explicit_path.is_empty() {
            let path = PathBuf::from(explicit_path);
            if path.exists() {
                return Ok(explicit_path.to_string());
            }
        }

        // 2. Check current working directory
        let current_dir_config = PathBuf::from(CONFIG_FILE_NAME);
        if current_dir_config.exists() {
            return Ok(current_dir_config.to_string_lossy().to_string());
        }

        // 3. Check system-wide configuration directory
        let etc_config = PathBuf::from(SYSTEM_CONFIG_PATH);
        if etc_config.exists() {
            return Ok(etc_config.to_string_lossy().to_string());
        }

        Err(ConfigError::NotFound(
            "Tried the given path, the current directory, and /etc/attestation_client".to_string(),
        ))
    }

    /// Get the actual path of the configuration file
    pub fn get_config_path(&self) -> &str {
        &self.config_path
    }

    pub fn config(&self) -> Result<&'static Config, ConfigError> {
        CLIENT_CONFIG.get_instance().map_err(ConfigError::Load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connector::EvidenceAdapter;
    use std::sync::Arc;
    use tpm_attester::TpmAdapter;

    const MINIMAL: &str = "trust_authority:\n  base_url: https://portal.example.com\n  api_key: secret\n";

    #[test]
    fn test_minimal_config_defaults() {
        let config = Config::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.trust_authority.request_timeout_secs, 60);
        assert!(config.tpm.is_none());
        assert!(config.logging.is_none());
        assert!(config.attest.policy_ids.is_empty());
        assert!(config.tpm_adapter_options().unwrap().is_empty());

        let connector_config = config.connector_config().unwrap();
        assert_eq!(connector_config.api_url(), "https://portal.example.com");
        assert_eq!(connector_config.timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_invalid_trust_authority() {
        let yaml = "trust_authority:\n  base_url: not-a-url\n  api_key: secret\n";
        assert!(matches!(Config::from_yaml_str(yaml), Err(ConfigError::Validation(_))));

        let yaml = "trust_authority:\n  base_url: https://portal.example.com\n  api_key: ''\n";
        assert!(matches!(Config::from_yaml_str(yaml), Err(ConfigError::Validation(_))));

        let yaml = "trust_authority:\n  base_url: https://portal.example.com\n  api_key: k\n  request_timeout_secs: 0\n";
        assert!(matches!(Config::from_yaml_str(yaml), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_tpm_section() {
        let yaml = format!(
            "{}tpm:\n  device_type: swtpm\n  ak_handle: 2164262913\n  pcr_selections: \"sha256:0,1,7+sha1:0\"\n  owner_auth: owner\n",
            MINIMAL
        );
        let config = Config::from_yaml_str(&yaml).unwrap();
        let adapter = TpmAdapter::new(config.tpm_adapter_options().unwrap()).unwrap();
        assert_eq!(adapter.ak_handle(), 0x8100_0801);
        assert_eq!(adapter.device_type(), TpmDeviceType::Swtpm);
        assert_eq!(adapter.pcr_selections().len(), 2);
    }

    #[test]
    fn test_invalid_tpm_section() {
        for tpm in [
            "tpm:\n  device_type: tbs\n",
            "tpm:\n  ak_handle: 1\n",
            "tpm:\n  pcr_selections: \"sha256:24\"\n",
        ] {
            let yaml = format!("{}{}", MINIMAL, tpm);
            assert!(matches!(Config::from_yaml_str(&yaml), Err(ConfigError::Validation(_))), "{}", tpm);
        }
    }

    #[test]
    fn test_attest_section() {
        let yaml = format!(
            "{}attest:\n  token_signing_alg: PS384\n  policy_ids: [\"4b7e2a42-5d86-4d6f-a7b8-3c1f10b5e0aa\"]\n  policy_must_match: true\n",
            MINIMAL
        );
        let config = Config::from_yaml_str(&yaml).unwrap();
        let adapter: Arc<dyn EvidenceAdapter> = Arc::new(TpmAdapter::new(Vec::new()).unwrap());
        let args = config.attest_args(Adapters::Single(adapter)).unwrap();
        assert_eq!(args.token_signing_alg, Some(TokenSigningAlg::PS384));
        assert_eq!(args.policy_ids.len(), 1);
        assert!(args.policy_must_match);

        let yaml = format!("{}attest:\n  token_signing_alg: HS256\n", MINIMAL);
        assert!(Config::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_too_many_policy_ids() {
        let ids: Vec<String> = (0..11).map(|_| format!("\"{}\"", Uuid::new_v4())).collect();
        let yaml = format!("{}attest:\n  policy_ids: [{}]\n", MINIMAL, ids.join(", "));
        assert!(matches!(Config::from_yaml_str(&yaml), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_missing_ca_file() {
        let yaml = format!("{}  ca_path: /nonexistent/ca.pem\n", MINIMAL);
        let config = Config::from_yaml_str(&yaml).unwrap();
        assert!(matches!(config.connector_config(), Err(ConfigError::Load(_))));
    }
}
