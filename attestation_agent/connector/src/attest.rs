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

use crate::adapter::{CompositeAdapter, EvidenceAdapter};
use crate::client::Connector;
use crate::connector_error::{AdapterError, ConnectorError};
use crate::evidence::CompositeEvidenceDocument;
use crate::nonce::Nonce;
use log::{debug, error, info};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

pub const MAX_POLICY_IDS: usize = 10;

/// Token signing algorithm requested from the verification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenSigningAlg {
    RS256,
    PS384,
}

impl FromStr for TokenSigningAlg {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RS256" => Ok(TokenSigningAlg::RS256),
            "PS384" => Ok(TokenSigningAlg::PS384),
            other => Err(ConnectorError::Configuration(format!("Unsupported token signing algorithm: {}", other))),
        }
    }
}

impl fmt::Display for TokenSigningAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSigningAlg::RS256 => write!(f, "RS256"),
            TokenSigningAlg::PS384 => write!(f, "PS384"),
        }
    }
}

/// Evidence sources for one attestation attempt.
#[derive(Clone)]
pub enum Adapters {
    /// Legacy path: one adapter fed with the raw nonce.
    Single(Arc<dyn EvidenceAdapter>),
    /// One entry per adapter in a composite evidence document.
    Composite(Vec<Arc<dyn CompositeAdapter>>),
}

/// Arguments for a single call to [`Connector::attest`].
#[derive(Clone)]
pub struct AttestArgs {
    pub adapters: Adapters,
    /// Pinned nonce; a fresh one is fetched when `None`.
    pub verifier_nonce: Option<Nonce>,
    pub user_data: Vec<u8>,
    pub request_id: Option<String>,
    pub token_signing_alg: Option<TokenSigningAlg>,
    pub policy_ids: Vec<Uuid>,
    pub policy_must_match: bool,
    pub get_token_signing_certificate: bool,
}

impl AttestArgs {
    pub fn new(adapters: Adapters) -> Self {
        Self {
            adapters,
            verifier_nonce: None,
            user_data: Vec::new(),
            request_id: None,
            token_signing_alg: None,
            policy_ids: Vec::new(),
            policy_must_match: false,
            get_token_signing_certificate: false,
        }
    }

    pub fn single(adapter: Arc<dyn EvidenceAdapter>) -> Self {
        Self::new(Adapters::Single(adapter))
    }

    pub fn composite(adapters: Vec<Arc<dyn CompositeAdapter>>) -> Self {
        Self::new(Adapters::Composite(adapters))
    }

    pub fn with_verifier_nonce(mut self, nonce: Nonce) -> Self {
        self.verifier_nonce = Some(nonce);
        self
    }

    pub fn with_user_data(mut self, user_data: Vec<u8>) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_token_signing_alg(mut self, alg: TokenSigningAlg) -> Self {
        self.token_signing_alg = Some(alg);
        self
    }

    pub fn with_policy_ids(mut self, policy_ids: Vec<Uuid>, must_match: bool) -> Self {
        self.policy_ids = policy_ids;
        self.policy_must_match = must_match;
        self
    }

    pub fn with_token_signing_certificate(mut self, fetch: bool) -> Self {
        self.get_token_signing_certificate = fetch;
        self
    }

    fn validate(&self) -> Result<(), ConnectorError> {
        if self.policy_ids.len() > MAX_POLICY_IDS {
            return Err(ConnectorError::Configuration(format!(
                "At most {} policy ids are allowed, got {}",
                MAX_POLICY_IDS,
                self.policy_ids.len()
            )));
        }
        if let Adapters::Composite(adapters) = &self.adapters {
            distinct_identifiers(adapters)?;
        }
        if let Some(nonce) = &self.verifier_nonce {
            nonce.validate()?;
        }
        Ok(())
    }
}

/// Body posted to the attest endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest {
    pub evidence: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer_nonce: Option<Nonce>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_signing_alg: Option<TokenSigningAlg>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub policy_ids: Vec<Uuid>,
    pub policy_must_match: bool,
}

/// Result of a successful attestation.
#[derive(Debug, Clone)]
pub struct AttestResponse {
    pub token: String,
    /// Headers of the token response, for request-id or trace-id correlation.
    pub headers: HeaderMap,
    pub token_signing_certificates: Option<String>,
}

impl Connector {
    /// Run one attestation attempt: nonce, evidence, token.
    ///
    /// The first failure aborts the attempt. Nothing is retried.
    pub async fn attest(&self, args: AttestArgs) -> Result<AttestResponse, ConnectorError> {
        args.validate()?;
        let request_id = args.request_id.as_deref();

        let nonce = match &args.verifier_nonce {
            Some(nonce) => {
                debug!("Using pinned verifier nonce");
                nonce.clone()
            },
            None => self.get_nonce(request_id).await?,
        };

        let evidence = match &args.adapters {
            Adapters::Single(adapter) => collect_single(Arc::clone(adapter), &nonce).await?,
            Adapters::Composite(adapters) => {
                let document = collect_composite(adapters, &nonce, &args.user_data).await?;
                serde_json::to_value(&document)
                    .map_err(|e| ConnectorError::Configuration(format!("Failed to encode evidence: {}", e)))?
            },
        };

        let request = TokenRequest {
            evidence,
            signer_nonce: Some(nonce),
            request_id: args.request_id.clone(),
            token_signing_alg: args.token_signing_alg,
            policy_ids: args.policy_ids.clone(),
            policy_must_match: args.policy_must_match,
        };
        let (token, headers) = self.get_token(&request, request_id).await?;
        info!("Attestation token received");

        let token_signing_certificates = if args.get_token_signing_certificate {
            Some(self.get_token_signing_certificates().await?)
        } else {
            None
        };

        Ok(AttestResponse { token, headers, token_signing_certificates })
    }
}

async fn collect_single(adapter: Arc<dyn EvidenceAdapter>, nonce: &Nonce) -> Result<Value, ConnectorError> {
    let identifier = adapter.get_evidence_identifier();
    info!("Collecting evidence from adapter '{}'", identifier);

    let raw_nonce = nonce.binding_bytes();
    let evidence = tokio::task::spawn_blocking(move || adapter.collect_evidence(&raw_nonce))
        .await
        .map_err(|e| {
            ConnectorError::evidence_collection(&identifier, AdapterError::Hardware(format!("adapter task failed: {}", e)))
        })?
        .map_err(|e| {
            error!("Adapter '{}' failed: {}", identifier, e);
            ConnectorError::evidence_collection(&identifier, e)
        })?;

    serde_json::to_value(&evidence).map_err(|e| ConnectorError::evidence_collection(&identifier, e.into()))
}

fn distinct_identifiers(adapters: &[Arc<dyn CompositeAdapter>]) -> Result<Vec<String>, ConnectorError> {
    if adapters.is_empty() {
        return Err(ConnectorError::Configuration("No composite adapters configured".to_string()));
    }
    let mut seen = HashSet::new();
    let mut identifiers = Vec::with_capacity(adapters.len());
    for adapter in adapters {
        let identifier = adapter.get_evidence_identifier();
        if identifier.is_empty() {
            return Err(ConnectorError::Configuration("Adapter evidence identifier must not be empty".to_string()));
        }
        if !seen.insert(identifier.clone()) {
            return Err(ConnectorError::Configuration(format!("Duplicate evidence identifier '{}'", identifier)));
        }
        identifiers.push(identifier);
    }
    Ok(identifiers)
}

/// Run the adapters in order against the same nonce and user data.
///
/// Adapters after the first failing one are never invoked.
async fn collect_composite(
    adapters: &[Arc<dyn CompositeAdapter>],
    nonce: &Nonce,
    user_data: &[u8],
) -> Result<CompositeEvidenceDocument, ConnectorError> {
    let identifiers = distinct_identifiers(adapters)?;
    let nonce = Arc::new(nonce.clone());
    let user_data: Arc<[u8]> = Arc::from(user_data);

    let mut document = CompositeEvidenceDocument::new();
    for (adapter, identifier) in adapters.iter().zip(identifiers) {
        info!("Collecting evidence from adapter '{}'", identifier);
        let adapter = Arc::clone(adapter);
        let task_nonce = Arc::clone(&nonce);
        let task_user_data = Arc::clone(&user_data);
        let result = tokio::task::spawn_blocking(move || adapter.get_evidence(Some(task_nonce.as_ref()), &task_user_data))
            .await
            .map_err(|e| {
                ConnectorError::evidence_collection(&identifier, AdapterError::Hardware(format!("adapter task failed: {}", e)))
            })?;
        let evidence = result.map_err(|e| {
            error!("Adapter '{}' failed: {}", identifier, e);
            ConnectorError::evidence_collection(&identifier, e)
        })?;
        document.insert(identifier, evidence)?;
    }
    Ok(document)
}
