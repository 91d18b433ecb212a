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

use crate::connector_error::AdapterError;
use crate::evidence::Evidence;
use crate::nonce::Nonce;
use serde_json::Value;

/// Single-root evidence collector.
///
/// `collect_evidence` receives the raw nonce (`val || iat`) and must return an
/// error rather than empty evidence when the hardware source yields nothing.
pub trait EvidenceAdapter: Send + Sync {
    fn get_evidence_identifier(&self) -> String;

    fn collect_evidence(&self, nonce: &[u8]) -> Result<Evidence, AdapterError>;
}

/// Evidence collector that contributes one entry to a composite evidence document.
///
/// The returned value is stored under `get_evidence_identifier()`. When
/// `verifier_nonce` is `None` the hardware evidence is unbound.
pub trait CompositeAdapter: Send + Sync {
    fn get_evidence_identifier(&self) -> String;

    fn get_evidence(&self, verifier_nonce: Option<&Nonce>, user_data: &[u8]) -> Result<Value, AdapterError>;
}
