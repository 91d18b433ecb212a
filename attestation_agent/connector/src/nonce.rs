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

use crate::connector_error::ConnectorError;
use serde::{Deserialize, Serialize};

/// Anti-replay nonce issued by the verification service.
///
/// A nonce is valid for exactly one attestation attempt. It is passed to the
/// evidence adapters unmodified and echoed back to the service alongside the
/// evidence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce {
    #[serde(rename = "val", with = "crate::base64_serde")]
    pub value: Vec<u8>,
    #[serde(rename = "iat", with = "crate::base64_serde")]
    pub issued_at: Vec<u8>,
    #[serde(with = "crate::base64_serde")]
    pub signature: Vec<u8>,
}

impl Nonce {
    pub fn new(value: Vec<u8>, issued_at: Vec<u8>, signature: Vec<u8>) -> Self {
        Self { value, issued_at, signature }
    }

    /// Parse a nonce response body, rejecting anything that is not a complete nonce.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, ConnectorError> {
        let nonce: Nonce = serde_json::from_slice(body).map_err(|e| {
            log::error!("Failed to parse nonce response: {}", e);
            ConnectorError::NonceParse(e.to_string())
        })?;
        nonce.validate()?;
        Ok(nonce)
    }

    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.value.is_empty() || self.issued_at.is_empty() || self.signature.is_empty() {
            return Err(ConnectorError::NonceParse("One or more nonce fields are empty".to_string()));
        }
        Ok(())
    }

    /// `value || issued_at`, the raw nonce handed to legacy adapters and to
    /// hardware that performs its own binding.
    pub fn binding_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.value.len() + self.issued_at.len());
        bytes.extend_from_slice(&self.value);
        bytes.extend_from_slice(&self.issued_at);
        bytes
    }
}
