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

use crate::config::{LogConfig, LoggerConfig};
use chrono::{DateTime, Local};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger as SizeBasedTriggerPolicy;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::{
    append::rolling_file::RollingFileAppender,
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config, Handle,
};
use std::path::{Path, PathBuf};

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S:%3f)} {l} [{M}:{L}] - {m}{n}";
const CONSOLE_APPENDER: &str = "console_appender";
const ROOT_APPENDER: &str = "root_appender";

pub struct Logger {
    handle: Handle,
}

impl Logger {
    pub fn new_from_yaml(config_path: impl Into<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let config = LogConfig::from_yaml(config_path)?;
        Self::new_from_config(config)
    }

    pub fn new_from_config(config: LogConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let log4rs_config = Self::build_config(&config)?;
        let handle = log4rs::init_config(log4rs_config)?;
        Ok(Self { handle })
    }

    /// Replace the active configuration.
    pub fn reconfigure(&self, config: &LogConfig) -> Result<(), Box<dyn std::error::Error>> {
        self.handle.set_config(Self::build_config(config)?);
        Ok(())
    }

    /// Builds the log4rs configuration. Without any configured loggers
    /// everything goes to the console at info level.
    pub fn build_config(config: &LogConfig) -> Result<Config, Box<dyn std::error::Error>> {
        let mut log4rs_config = Config::builder();

        if config.loggers.is_empty() {
            let console = ConsoleAppender::builder().encoder(Box::new(PatternEncoder::new(LOG_PATTERN))).build();
            let root = Root::builder().appender(CONSOLE_APPENDER).build(LevelFilter::Info);
            return Ok(log4rs_config
                .appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(console)))
                .build(root)?);
        }

        // Create appenders for each logger configuration
        for logger_config in &config.loggers {
            let appender = Self::create_appender(logger_config)?;
            let appender_name = format!("{}_appender", logger_config.path_prefix);
            log4rs_config = log4rs_config.appender(Appender::builder().build(&appender_name, Box::new(appender)));

            if logger_config.path_prefix == "root" {
                continue;
            }
            let logger = log4rs::config::Logger::builder()
                .appender(appender_name)
                .additive(false)
                .build(logger_config.path_prefix.clone(), parse_level(&logger_config.level));
            log4rs_config = log4rs_config.logger(logger);
        }

        let root = match config.get_root_config() {
            Some(root_config) => Root::builder().appender(ROOT_APPENDER).build(parse_level(&root_config.level)),
            None => Root::builder().build(LevelFilter::Info),
        };
        Ok(log4rs_config.build(root)?)
    }

    fn create_appender(config: &LoggerConfig) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
        let log_directory = Path::new(&config.log_directory);
        std::fs::create_dir_all(log_directory)?;

        // Archive names carry the creation time so restarts never overwrite old archives
        let now: DateTime<Local> = Local::now();
        let formatted_time = now.format("%Y%m%d%H%M%S%3f").to_string();

        let log_file = log_directory.join(&config.log_file_name);
        let archived_log_pattern = format!(
            "{}/{}-{{}}-{}.gz",
            log_directory.display(),
            config.log_file_name,
            formatted_time
        );

        let size_trigger = SizeBasedTriggerPolicy::new(config.max_file_size);
        let roller = FixedWindowRoller::builder().build(&archived_log_pattern, config.max_zip_count)?;
        let compound_policy = CompoundPolicy::new(Box::new(size_trigger), Box::new(roller));

        let appender = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(log_file, Box::new(compound_policy))?;

        Ok(appender)
    }
}

/// Unknown levels fall back to info.
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    }
}
