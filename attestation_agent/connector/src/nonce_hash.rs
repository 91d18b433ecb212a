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

//! Nonce binding shared by quote-producing adapters.
//!
//! The digest input is `nonce.val || nonce.iat || user_data`, in that order.
//! Verifiers rebuild the same input, so the order is part of the wire
//! contract and must not change.

use crate::nonce::Nonce;
use openssl::sha::Sha256;

pub const NONCE_HASH_SIZE: usize = 32;

/// Compute the SHA-256 binding digest over the verifier nonce and user data.
///
/// Absent inputs contribute nothing; with both absent the result is the
/// digest of the empty input.
pub fn create_nonce_hash(verifier_nonce: Option<&Nonce>, user_data: &[u8]) -> [u8; NONCE_HASH_SIZE] {
    let mut hasher = Sha256::new();
    if let Some(nonce) = verifier_nonce {
        if !nonce.value.is_empty() {
            hasher.update(&nonce.value);
        }
        if !nonce.issued_at.is_empty() {
            hasher.update(&nonce.issued_at);
        }
    }
    if !user_data.is_empty() {
        hasher.update(user_data);
    }
    hasher.finish()
}
