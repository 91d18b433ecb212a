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

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub loggers: Vec<LoggerConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerConfig {
    /// Module path prefix the logger applies to, `root` for the root logger
    pub path_prefix: String,
    pub log_directory: String,
    pub log_file_name: String,
    pub max_file_size: u64,
    pub max_zip_count: u32,
    pub level: String,
}

impl LogConfig {
    pub fn from_yaml(path: impl Into<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let config_str = std::fs::read_to_string(path.into())?;
        let config: LogConfig = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }

    pub fn get_logger_config(&self, path_prefix: &str) -> Option<&LoggerConfig> {
        self.loggers.iter().find(|l| path_prefix.starts_with(&l.path_prefix))
    }

    pub fn get_root_config(&self) -> Option<&LoggerConfig> {
        self.get_logger_config("root")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn logger(prefix: &str) -> LoggerConfig {
        LoggerConfig {
            path_prefix: prefix.to_string(),
            log_directory: "logs".to_string(),
            log_file_name: format!("{}.log", prefix),
            max_file_size: 1024,
            max_zip_count: 3,
            level: "info".to_string(),
        }
    }

    #[test]
    fn test_get_logger_config_matches_prefix() {
        let config = LogConfig { loggers: vec![logger("root"), logger("connector")] };
        assert_eq!(config.get_logger_config("connector::client").unwrap().path_prefix, "connector");
        assert_eq!(config.get_root_config().unwrap().path_prefix, "root");
        assert!(config.get_logger_config("tpm_attester").is_none());
    }

    #[test]
    fn test_from_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "loggers:\n  - path_prefix: root\n    log_directory: logs\n    log_file_name: client.log\n    max_file_size: 10485760\n    max_zip_count: 6\n    level: debug\n"
        )
        .unwrap();
        let config = LogConfig::from_yaml(file.path()).unwrap();
        assert_eq!(config.loggers.len(), 1);
        assert_eq!(config.loggers[0].level, "debug");
    }

    #[test]
    fn test_empty_yaml_has_no_loggers() {
        let config: LogConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.loggers.is_empty());
    }
}
