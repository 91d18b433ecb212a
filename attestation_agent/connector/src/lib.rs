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

//! Remote attestation client.
//!
//! A [`Connector`] fetches a nonce from the verification service, collects
//! evidence through one or more adapters and exchanges it for a token.

pub mod adapter;
pub mod attest;
pub mod base64_serde;
pub mod client;
pub mod connector_error;
pub mod evidence;
pub mod nonce;
pub mod nonce_hash;

pub use adapter::{CompositeAdapter, EvidenceAdapter};
pub use attest::{Adapters, AttestArgs, AttestResponse, TokenRequest, TokenSigningAlg, MAX_POLICY_IDS};
pub use client::{Connector, ConnectorConfig};
pub use connector_error::{AdapterError, ConnectorError, ErrorKind};
pub use evidence::{CompositeEvidenceDocument, Evidence, EvidencePayload};
pub use nonce::Nonce;
pub use nonce_hash::{create_nonce_hash, NONCE_HASH_SIZE};
