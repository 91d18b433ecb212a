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

use connector::AdapterError;
use std::fmt;
use std::str::FromStr;

/// Where the TPM is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TpmDeviceType {
    /// In-kernel resource manager, `/dev/tpmrm0`
    #[default]
    Linux,
    /// Raw character device, `/dev/tpm0`
    LinuxLegacy,
    /// Microsoft TPM simulator on localhost:2321
    Mssim,
    /// swtpm socket interface on localhost:2321
    Swtpm,
}

impl TpmDeviceType {
    /// TCTI configuration string for the device.
    pub fn tcti_name(&self) -> &'static str {
        match self {
            TpmDeviceType::Linux => "device:/dev/tpmrm0",
            TpmDeviceType::LinuxLegacy => "device:/dev/tpm0",
            TpmDeviceType::Mssim => "mssim:host=localhost,port=2321",
            TpmDeviceType::Swtpm => "swtpm:host=localhost,port=2321",
        }
    }
}

impl FromStr for TpmDeviceType {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(TpmDeviceType::Linux),
            "linux-legacy" => Ok(TpmDeviceType::LinuxLegacy),
            "mssim" => Ok(TpmDeviceType::Mssim),
            "swtpm" => Ok(TpmDeviceType::Swtpm),
            other => Err(AdapterError::Configuration(format!("Unsupported TPM device type: {}", other))),
        }
    }
}

impl fmt::Display for TpmDeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TpmDeviceType::Linux => "linux",
            TpmDeviceType::LinuxLegacy => "linux-legacy",
            TpmDeviceType::Mssim => "mssim",
            TpmDeviceType::Swtpm => "swtpm",
        };
        f.write_str(name)
    }
}
