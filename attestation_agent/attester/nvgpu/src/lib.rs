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

//! GPU evidence adapter.

use connector::{AdapterError, CompositeAdapter, Evidence, EvidenceAdapter, Nonce};
use log::{error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const GPU_EVIDENCE_IDENTIFIER: &str = "nvgpu";

/// Architecture label sent with every report. The adapter does not query the
/// device for it.
pub const GPU_ARCH: &str = "HOPPER";

/// Only the first record returned by the provider is reported. Multi-GPU
/// payloads are not supported by the service's evidence format.
pub const SINGLE_DEVICE_ONLY: bool = true;

pub const DEFAULT_SESSION_ID: u32 = 123123;

const DEVICE_LOCK_TIMEOUT: u64 = 120; // seconds

/// One attestation report from an attached GPU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEvidence {
    pub evidence: String,
    pub certificate: String,
}

/// Vendor SDK access to attached GPUs.
pub trait RemoteEvidenceProvider: Send + Sync {
    fn get_remote_evidence(&self, session_id: u32, nonce: &[u8]) -> Result<Vec<RemoteEvidence>, AdapterError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuEvidence {
    pub arch: String,
    pub evidence: String,
    pub certificate: String,
    #[serde(rename = "gpu_nonce", with = "connector::base64_serde")]
    pub nonce: Vec<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifier_nonce: Option<Nonce>,
}

pub struct GpuAdapter {
    provider: Arc<dyn RemoteEvidenceProvider>,
    session_id: u32,
    device_lock: Mutex<()>,
}

impl GpuAdapter {
    pub fn new(provider: Arc<dyn RemoteEvidenceProvider>) -> Self {
        Self { provider, session_id: DEFAULT_SESSION_ID, device_lock: Mutex::new(()) }
    }

    pub fn with_session_id(mut self, session_id: u32) -> Self {
        self.session_id = session_id;
        self
    }

    /// Request a report bound to `nonce` and keep the first record.
    ///
    /// Calls sharing this adapter reach the provider one at a time.
    pub fn collect_gpu_evidence(&self, nonce: &[u8]) -> Result<GpuEvidence, AdapterError> {
        let _guard = self.device_lock.try_lock_for(Duration::from_secs(DEVICE_LOCK_TIMEOUT)).ok_or_else(|| {
            error!("GPU device lock acquire timeout");
            AdapterError::Hardware("GPU device lock acquire timeout".to_string())
        })?;

        let records = self
            .provider
            .get_remote_evidence(self.session_id, nonce)
            .map_err(|e| AdapterError::Hardware(format!("failed to get remote evidence: {}", e)))?;

        let mut records = records.into_iter();
        let first = records.next().ok_or_else(|| AdapterError::NoEvidence("no evidence returned".to_string()))?;
        let skipped = records.count();
        if SINGLE_DEVICE_ONLY && skipped > 0 {
            warn!("{} additional GPU evidence record(s) ignored", skipped);
        }

        Ok(GpuEvidence {
            arch: GPU_ARCH.to_string(),
            evidence: first.evidence,
            certificate: first.certificate,
            nonce: nonce.to_vec(),
            verifier_nonce: None,
        })
    }
}

impl CompositeAdapter for GpuAdapter {
    fn get_evidence_identifier(&self) -> String {
        GPU_EVIDENCE_IDENTIFIER.to_string()
    }

    fn get_evidence(&self, verifier_nonce: Option<&Nonce>, _user_data: &[u8]) -> Result<Value, AdapterError> {
        // The provider binds the nonce itself, so it gets the raw bytes.
        let nonce = verifier_nonce.map(Nonce::binding_bytes).unwrap_or_default();
        let mut evidence = self.collect_gpu_evidence(&nonce)?;
        evidence.verifier_nonce = verifier_nonce.cloned();
        info!("GPU evidence collected");
        Ok(serde_json::to_value(evidence)?)
    }
}

impl EvidenceAdapter for GpuAdapter {
    fn get_evidence_identifier(&self) -> String {
        GPU_EVIDENCE_IDENTIFIER.to_string()
    }

    fn collect_evidence(&self, nonce: &[u8]) -> Result<Evidence, AdapterError> {
        let evidence = self.collect_gpu_evidence(nonce)?;
        Ok(Evidence::structured(GPU_EVIDENCE_IDENTIFIER, serde_json::to_value(evidence)?))
    }
}
