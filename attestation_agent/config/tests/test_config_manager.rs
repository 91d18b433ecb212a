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

use config::{ConfigError, ConfigManager, CLIENT_CONFIG};
use serial_test::serial;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
#[serial]
fn test_config_manager_loads_explicit_path() {
    let log_dir = tempfile::tempdir().unwrap();
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        "trust_authority:
  base_url: https://portal.example.com
  api_url: https://api.example.com
  api_key: secret
tpm:
  device_type: linux
  pcr_selections: \"sha256:0,7\"
logging:
  loggers:
    - path_prefix: root
      log_directory: {}
      log_file_name: client.log
      max_file_size: 10485760
      max_zip_count: 3
      level: info
",
        log_dir.path().display()
    )
    .unwrap();
    let path = file.path().to_string_lossy().to_string();

    let manager = ConfigManager::new(&path).unwrap();
    assert_eq!(manager.get_config_path(), path);

    let config = manager.config().unwrap();
    assert!(CLIENT_CONFIG.is_initialized());
    assert_eq!(config.trust_authority.api_url.as_deref(), Some("https://api.example.com"));
    assert_eq!(config.tpm_adapter_options().unwrap().len(), 2);

    config.init_logging().unwrap();
    log::info!("client configuration test");
    assert!(log_dir.path().join("client.log").exists());
}

#[test]
#[serial]
fn test_missing_explicit_path_falls_back() {
    match ConfigManager::find_config_path("/nonexistent/client_config.yaml") {
        Ok(path) => assert_ne!(path, "/nonexistent/client_config.yaml"),
        Err(err) => assert!(matches!(err, ConfigError::NotFound(_))),
    }
}
