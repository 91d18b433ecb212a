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

/// Configuration management module for loading and accessing application configuration.
///
/// Configuration is parsed from YAML into a caller-defined type and held in a
/// `OnceLock` backed singleton. A validation hook runs before the value is
/// published, so readers never observe an invalid configuration.
///
/// # Example
///
/// ```no_run
/// use serde::Deserialize;
///
/// use config_manager::ConfigSingleton;
///
/// #[derive(Deserialize)]
/// struct AppConfig {
///     app_name: String,
///     #[serde(default)]
///     port: u16,
/// }
///
/// static CONFIG: ConfigSingleton<AppConfig> = ConfigSingleton::new();
///
/// CONFIG.initialize("config.yaml").expect("Failed to load config");
/// let app_config = CONFIG.get_instance().expect("Config not initialized");
/// println!("App running: {} on port {}", app_config.app_name, app_config.port);
/// ```
pub mod manager;

// Re-export key struct
pub use manager::{load_yaml, ConfigSingleton};
