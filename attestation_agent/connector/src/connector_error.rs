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

use thiserror::Error;

/// Errors returned by evidence adapters.
///
/// Adapters wrap the underlying hardware or provider failure in one of these
/// variants; the connector attaches the adapter identifier when it surfaces
/// the failure as `ConnectorError::EvidenceCollection`.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Input error: {0}")]
    Input(String),

    #[error("Hardware error: {0}")]
    Hardware(String),

    #[error("No evidence returned: {0}")]
    NoEvidence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        AdapterError::Serialization(err.to_string())
    }
}

/// Coarse classification of a `ConnectorError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NonceFetch,
    NonceParse,
    EvidenceCollection,
    TokenSubmission,
    TokenParse,
    CertificateFetch,
    Configuration,
}

/// Errors that may occur during one attestation attempt.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Transport or HTTP failure while requesting a nonce
    #[error("Failed to fetch nonce: {0}")]
    NonceFetch(String),

    /// Nonce response body is not a valid nonce
    #[error("Failed to parse nonce: {0}")]
    NonceParse(String),

    /// An adapter failed to produce evidence
    #[error("Failed to collect evidence from adapter '{adapter_id}': {source}")]
    EvidenceCollection {
        adapter_id: String,
        #[source]
        source: AdapterError,
    },

    /// Transport or HTTP failure while posting evidence
    #[error("Failed to submit evidence: {0}")]
    TokenSubmission(String),

    /// Token response body is malformed
    #[error("Failed to parse token: {0}")]
    TokenParse(String),

    /// Failure while downloading the token signing certificates
    #[error("Failed to fetch token signing certificates: {0}")]
    CertificateFetch(String),

    /// Invalid connector configuration or attestation arguments
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ConnectorError {
    pub fn evidence_collection<S: Into<String>>(adapter_id: S, source: AdapterError) -> Self {
        ConnectorError::EvidenceCollection { adapter_id: adapter_id.into(), source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectorError::NonceFetch(_) => ErrorKind::NonceFetch,
            ConnectorError::NonceParse(_) => ErrorKind::NonceParse,
            ConnectorError::EvidenceCollection { .. } => ErrorKind::EvidenceCollection,
            ConnectorError::TokenSubmission(_) => ErrorKind::TokenSubmission,
            ConnectorError::TokenParse(_) => ErrorKind::TokenParse,
            ConnectorError::CertificateFetch(_) => ErrorKind::CertificateFetch,
            ConnectorError::Configuration(_) => ErrorKind::Configuration,
        }
    }
}
