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
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const MAX_PCR_INDEX: u8 = 23;

/// PCR bank hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PcrHashAlg {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
    Sm3,
}

impl FromStr for PcrHashAlg {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" => Ok(PcrHashAlg::Sha1),
            "sha256" => Ok(PcrHashAlg::Sha256),
            "sha384" => Ok(PcrHashAlg::Sha384),
            "sha512" => Ok(PcrHashAlg::Sha512),
            "sm3" => Ok(PcrHashAlg::Sm3),
            other => Err(AdapterError::Configuration(format!("Unknown hash algorithm: {}", other))),
        }
    }
}

impl fmt::Display for PcrHashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PcrHashAlg::Sha1 => "sha1",
            PcrHashAlg::Sha256 => "sha256",
            PcrHashAlg::Sha384 => "sha384",
            PcrHashAlg::Sha512 => "sha512",
            PcrHashAlg::Sm3 => "sm3",
        };
        f.write_str(name)
    }
}

/// One PCR bank and the register indices quoted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcrSelection {
    pub hash: PcrHashAlg,
    pub pcrs: Vec<u8>,
}

impl PcrSelection {
    pub fn new(hash: PcrHashAlg, pcrs: Vec<u8>) -> Result<Self, AdapterError> {
        let selection = Self { hash, pcrs };
        selection.validate()?;
        Ok(selection)
    }

    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.pcrs.is_empty() {
            return Err(AdapterError::Configuration(format!("No PCRs selected for bank {}", self.hash)));
        }
        if let Some(invalid) = self.pcrs.iter().find(|&&pcr| pcr > MAX_PCR_INDEX) {
            return Err(AdapterError::Configuration(format!(
                "Invalid PCR index {}. PCR indices must be between 0 and {}",
                invalid, MAX_PCR_INDEX
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = self.pcrs.iter().find(|pcr| !seen.insert(**pcr)) {
            return Err(AdapterError::Configuration(format!("Duplicate PCR index {} in bank {}", dup, self.hash)));
        }
        Ok(())
    }

    /// Indices in ascending order, the order the TPM reports digests in.
    pub fn sorted_pcrs(&self) -> Vec<u8> {
        let mut pcrs = self.pcrs.clone();
        pcrs.sort_unstable();
        pcrs
    }
}

/// Parses `"sha256:0,1,7"`.
impl FromStr for PcrSelection {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hash, pcrs) = s
            .split_once(':')
            .ok_or_else(|| AdapterError::Configuration(format!("Invalid PCR selection '{}', expected <alg>:<pcrs>", s)))?;
        let hash = hash.parse::<PcrHashAlg>()?;
        let pcrs = pcrs
            .split(',')
            .map(|pcr| {
                pcr.trim()
                    .parse::<u8>()
                    .map_err(|_| AdapterError::Configuration(format!("Invalid PCR index '{}'", pcr.trim())))
            })
            .collect::<Result<Vec<u8>, _>>()?;
        PcrSelection::new(hash, pcrs)
    }
}

impl fmt::Display for PcrSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pcrs: Vec<String> = self.pcrs.iter().map(u8::to_string).collect();
        write!(f, "{}:{}", self.hash, pcrs.join(","))
    }
}

/// Parses a `+` separated list of banks such as `"sha256:0,1,7+sha1:0"`.
pub fn parse_pcr_selections(s: &str) -> Result<Vec<PcrSelection>, AdapterError> {
    let selections = s
        .split('+')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.trim().parse::<PcrSelection>())
        .collect::<Result<Vec<_>, _>>()?;
    validate_pcr_selections(&selections)?;
    Ok(selections)
}

pub fn validate_pcr_selections(selections: &[PcrSelection]) -> Result<(), AdapterError> {
    if selections.is_empty() {
        return Err(AdapterError::Configuration("At least one PCR selection is required".to_string()));
    }
    let mut banks = HashSet::new();
    for selection in selections {
        selection.validate()?;
        if !banks.insert(selection.hash) {
            return Err(AdapterError::Configuration(format!("PCR bank {} selected more than once", selection.hash)));
        }
    }
    Ok(())
}

/// All 24 PCRs of the SHA-256 bank.
pub fn default_pcr_selections() -> Vec<PcrSelection> {
    vec![PcrSelection { hash: PcrHashAlg::Sha256, pcrs: (0..=MAX_PCR_INDEX).collect() }]
}
