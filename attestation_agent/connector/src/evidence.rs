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
use serde_json::Value;
use std::collections::BTreeMap;

/// Adapter-defined evidence body.
///
/// Tagged as `{"raw": <base64>}` or `{"structured": <json>}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidencePayload {
    Raw(#[serde(with = "crate::base64_serde")] Vec<u8>),
    Structured(Value),
}

impl Default for EvidencePayload {
    fn default() -> Self {
        EvidencePayload::Raw(Vec::new())
    }
}

/// Evidence produced by a single adapter for one attestation attempt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub identifier: String,
    #[serde(rename = "evidence")]
    pub payload: EvidencePayload,
    #[serde(default, with = "crate::base64_serde", skip_serializing_if = "Vec::is_empty")]
    pub user_data: Vec<u8>,
}

impl Evidence {
    pub fn raw<S: Into<String>>(identifier: S, payload: Vec<u8>) -> Self {
        Self { identifier: identifier.into(), payload: EvidencePayload::Raw(payload), ..Default::default() }
    }

    pub fn structured<S: Into<String>>(identifier: S, payload: Value) -> Self {
        Self { identifier: identifier.into(), payload: EvidencePayload::Structured(payload), ..Default::default() }
    }

    pub fn with_user_data(mut self, user_data: Vec<u8>) -> Self {
        self.user_data = user_data;
        self
    }
}

/// Evidence from several adapters keyed by adapter identifier.
///
/// An identifier can be present at most once per document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CompositeEvidenceDocument {
    entries: BTreeMap<String, Value>,
}

impl CompositeEvidenceDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<S: Into<String>>(&mut self, identifier: S, evidence: Value) -> Result<(), ConnectorError> {
        let identifier = identifier.into();
        if identifier.is_empty() {
            return Err(ConnectorError::Configuration("Evidence identifier must not be empty".to_string()));
        }
        if self.entries.contains_key(&identifier) {
            return Err(ConnectorError::Configuration(format!(
                "Duplicate evidence identifier '{}'",
                identifier
            )));
        }
        self.entries.insert(identifier, evidence);
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&Value> {
        self.entries.get(identifier)
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector_error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_raw_evidence_serialization() {
        let evidence = Evidence::raw("tpm", b"quote".to_vec()).with_user_data(b"ud".to_vec());
        let json = serde_json::to_value(&evidence).unwrap();
        assert_eq!(json, json!({"identifier": "tpm", "evidence": {"raw": "cXVvdGU="}, "user_data": "dWQ="}));
    }

    #[test]
    fn test_default_evidence_serializes() {
        let json = serde_json::to_value(Evidence::default()).unwrap();
        assert_eq!(json, json!({"identifier": "", "evidence": {"raw": ""}}));
    }

    #[test]
    fn test_structured_evidence_embeds_json() {
        let evidence = Evidence::structured("nvgpu", json!({"arch": "HOPPER"}));
        let json = serde_json::to_value(&evidence).unwrap();
        assert_eq!(json["evidence"]["structured"]["arch"], "HOPPER");

        let parsed: Evidence = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, evidence);
    }

    #[test]
    fn test_structured_string_keeps_its_variant() {
        let evidence = Evidence::structured("nvgpu", json!("cXVvdGU="));
        let json = serde_json::to_value(&evidence).unwrap();
        let parsed: Evidence = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.payload, EvidencePayload::Structured(json!("cXVvdGU=")));

        let raw: Evidence = serde_json::from_value(json!({"identifier": "tpm", "evidence": {"raw": "cXVvdGU="}})).unwrap();
        assert_eq!(raw.payload, EvidencePayload::Raw(b"quote".to_vec()));
    }

    #[test]
    fn test_composite_document_rejects_duplicates() {
        let mut doc = CompositeEvidenceDocument::new();
        doc.insert("tpm", json!({"quote": "q"})).unwrap();
        doc.insert("nvgpu", json!({"evidence": "e"})).unwrap();

        let err = doc.insert("tpm", json!({})).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.get("tpm"), Some(&json!({"quote": "q"})));
    }

    #[test]
    fn test_composite_document_rejects_empty_identifier() {
        let mut doc = CompositeEvidenceDocument::new();
        assert!(doc.insert("", json!({})).is_err());
        assert!(doc.is_empty());
    }

    #[test]
    fn test_composite_document_serializes_as_map() {
        let mut doc = CompositeEvidenceDocument::new();
        doc.insert("tpm", json!(1)).unwrap();
        doc.insert("nvgpu", json!(2)).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"nvgpu": 2, "tpm": 1}));
        assert_eq!(doc.identifiers().collect::<Vec<_>>(), vec!["nvgpu", "tpm"]);
    }
}
