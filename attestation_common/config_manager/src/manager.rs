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
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::OnceLock;

/// Reads a YAML file and deserializes it into `T`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read, or if the YAML
/// content cannot be parsed into `T`.
pub fn load_yaml<T: for<'a> Deserialize<'a>, P: AsRef<Path>>(path: P) -> Result<T, String> {
    let file = File::open(path).map_err(|e| format!("Failed to open config file: {}", e))?;

    let mut contents = String::new();
    let mut reader = BufReader::new(file);
    reader.read_to_string(&mut contents).map_err(|e| format!("Failed to read config file: {}", e))?;

    serde_yaml::from_str(&contents).map_err(|e| format!("Failed to parse YAML: {}", e))
}

/// A thread-safe singleton configuration manager that loads and provides access to configuration data.
///
/// # Type Parameters
///
/// * `T` - The configuration type that must implement `Deserialize`, `Send`, `Sync`, and have a static lifetime.
pub struct ConfigSingleton<T: for<'a> Deserialize<'a> + Send + Sync + 'static> {
    instance: OnceLock<T>,
}

impl<T: for<'a> Deserialize<'a> + Send + Sync + 'static> Default for ConfigSingleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: for<'a> Deserialize<'a> + Send + Sync + 'static> ConfigSingleton<T> {
    /// Creates a new, uninitialized `ConfigSingleton` instance.
    pub const fn new() -> Self {
        ConfigSingleton { instance: OnceLock::new() }
    }

    /// Loads the YAML file at `path` into the singleton.
    ///
    /// Returns `Ok(())` without reloading if the singleton is already initialized.
    pub fn initialize<P: AsRef<Path>>(&self, path: P) -> Result<(), String> {
        self.initialize_with(path, |_| Ok(()))
    }

    /// Loads the YAML file at `path`, runs `validate` on the parsed value and
    /// publishes it only if validation succeeds.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// * The file cannot be opened or read
    /// * The YAML content cannot be parsed into the target type `T`
    /// * `validate` rejects the parsed value
    /// * Another caller published a configuration while this one was loading
    pub fn initialize_with<P, F>(&self, path: P, validate: F) -> Result<(), String>
    where
        P: AsRef<Path>,
        F: FnOnce(&T) -> Result<(), String>,
    {
        if self.instance.get().is_some() {
            return Ok(());
        }

        let config: T = load_yaml(path)?;
        validate(&config)?;

        self.instance
            .set(config)
            .map_err(|_| "Configuration was initialized concurrently, loaded value discarded".to_string())
    }

    /// Retrieves a reference to the initialized configuration instance.
    ///
    /// # Errors
    ///
    /// Returns an error if `initialize` has not been called successfully before calling this method.
    pub fn get_instance(&self) -> Result<&T, String> {
        self.instance.get().ok_or_else(|| "Configuration not initialized".to_string())
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestConfig {
        name: String,
        #[serde(default)]
        port: u16,
    }

    fn write_yaml(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_initialize_reports_lost_race() {
        let first = write_yaml("name: first\n");
        let second = write_yaml("name: second\n");
        let config = ConfigSingleton::<TestConfig>::new();

        let result = config.initialize_with(second.path(), |_| config.initialize(first.path()));
        assert!(result.is_err());
        assert_eq!(config.get_instance().unwrap().name, "first");
    }

    #[test]
    fn test_initialize_and_get_instance() {
        let file = write_yaml("name: agent\nport: 8080\n");
        let config = ConfigSingleton::<TestConfig>::new();
        assert!(config.get_instance().is_err());

        config.initialize(file.path()).unwrap();
        assert_eq!(config.get_instance().unwrap(), &TestConfig { name: "agent".to_string(), port: 8080 });
    }

    #[test]
    fn test_second_initialize_keeps_first_value() {
        let first = write_yaml("name: first\n");
        let second = write_yaml("name: second\n");
        let config = ConfigSingleton::<TestConfig>::new();

        config.initialize(first.path()).unwrap();
        config.initialize(second.path()).unwrap();
        assert_eq!(config.get_instance().unwrap().name, "first");
    }

    #[test]
    fn test_validation_failure_leaves_singleton_empty() {
        let file = write_yaml("name: ''\n");
        let config = ConfigSingleton::<TestConfig>::new();

        let result = config.initialize_with(file.path(), |c: &TestConfig| {
            if c.name.is_empty() {
                Err("name must not be empty".to_string())
            } else {
                Ok(())
            }
        });
        assert_eq!(result.unwrap_err(), "name must not be empty");
        assert!(!config.is_initialized());
    }

    #[test]
    fn test_load_errors() {
        assert!(load_yaml::<TestConfig, _>("/nonexistent/config.yaml").unwrap_err().starts_with("Failed to open"));

        let file = write_yaml("port: [not a number\n");
        assert!(load_yaml::<TestConfig, _>(file.path()).unwrap_err().starts_with("Failed to parse YAML"));
    }
}
