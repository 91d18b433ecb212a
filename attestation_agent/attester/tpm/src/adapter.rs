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

use crate::device::TpmDeviceType;
use crate::pcr::{default_pcr_selections, validate_pcr_selections, PcrSelection};
use crate::provider::TpmFactory;
use crate::tss::TssTpmFactory;
use connector::{create_nonce_hash, AdapterError, CompositeAdapter, Evidence, EvidenceAdapter, Nonce};
use log::{debug, error, info};
use openssl::sha::Sha256;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

pub const TPM_EVIDENCE_IDENTIFIER: &str = "tpm";
pub const DEFAULT_AK_HANDLE: u32 = 0x8100_0801;
/// Persistent object handle range
pub const AK_HANDLE_RANGE: RangeInclusive<u32> = 0x8100_0000..=0x81FF_FFFF;

const DEVICE_LOCK_TIMEOUT: u64 = 120; // seconds

/// A single adapter setting, validated when the adapter is built.
pub enum TpmAdapterOption {
    AkHandle(u32),
    PcrSelections(Vec<PcrSelection>),
    DeviceType(TpmDeviceType),
    OwnerAuth(String),
    UserData(Vec<u8>),
    Factory(Arc<dyn TpmFactory>),
}

pub fn with_ak_handle(ak_handle: u32) -> TpmAdapterOption {
    TpmAdapterOption::AkHandle(ak_handle)
}

pub fn with_pcr_selections(selections: Vec<PcrSelection>) -> TpmAdapterOption {
    TpmAdapterOption::PcrSelections(selections)
}

pub fn with_device_type(device_type: TpmDeviceType) -> TpmAdapterOption {
    TpmAdapterOption::DeviceType(device_type)
}

pub fn with_owner_auth<S: Into<String>>(owner_auth: S) -> TpmAdapterOption {
    TpmAdapterOption::OwnerAuth(owner_auth.into())
}

/// User data bound into quotes produced through [`EvidenceAdapter`].
pub fn with_user_data(user_data: Vec<u8>) -> TpmAdapterOption {
    TpmAdapterOption::UserData(user_data)
}

pub fn with_tpm_factory(factory: Arc<dyn TpmFactory>) -> TpmAdapterOption {
    TpmAdapterOption::Factory(factory)
}

#[derive(Serialize)]
struct TpmEvidence<'a> {
    #[serde(with = "connector::base64_serde")]
    quote: Vec<u8>,
    #[serde(with = "connector::base64_serde")]
    signature: Vec<u8>,
    #[serde(with = "connector::base64_serde")]
    pcrs: Vec<u8>,
    #[serde(with = "connector::base64_serde", skip_serializing_if = "<[u8]>::is_empty")]
    user_data: &'a [u8],
    #[serde(skip_serializing_if = "Option::is_none")]
    verifier_nonce: Option<&'a Nonce>,
}

/// Evidence adapter for the host TPM.
///
/// Building the adapter never touches the device. The TPM is opened for each
/// collection and closed before the call returns.
pub struct TpmAdapter {
    ak_handle: u32,
    pcr_selections: Vec<PcrSelection>,
    device_type: TpmDeviceType,
    owner_auth: String,
    user_data: Vec<u8>,
    factory: Arc<dyn TpmFactory>,
    device_lock: Mutex<()>,
}

impl TpmAdapter {
    pub fn new<I: IntoIterator<Item = TpmAdapterOption>>(options: I) -> Result<Self, AdapterError> {
        let mut adapter = Self {
            ak_handle: DEFAULT_AK_HANDLE,
            pcr_selections: default_pcr_selections(),
            device_type: TpmDeviceType::default(),
            owner_auth: String::new(),
            user_data: Vec::new(),
            factory: Arc::new(TssTpmFactory),
            device_lock: Mutex::new(()),
        };
        for option in options {
            adapter.apply(option)?;
        }
        debug!(
            "TPM adapter configured: device {}, AK handle {:#x}, {} PCR bank(s)",
            adapter.device_type,
            adapter.ak_handle,
            adapter.pcr_selections.len()
        );
        Ok(adapter)
    }

    fn apply(&mut self, option: TpmAdapterOption) -> Result<(), AdapterError> {
        match option {
            TpmAdapterOption::AkHandle(handle) => {
                if !AK_HANDLE_RANGE.contains(&handle) {
                    return Err(AdapterError::Configuration(format!(
                        "AK handle {:#x} is outside the persistent range {:#x}..={:#x}",
                        handle,
                        AK_HANDLE_RANGE.start(),
                        AK_HANDLE_RANGE.end()
                    )));
                }
                self.ak_handle = handle;
            },
            TpmAdapterOption::PcrSelections(selections) => {
                validate_pcr_selections(&selections)?;
                self.pcr_selections = selections;
            },
            TpmAdapterOption::DeviceType(device_type) => self.device_type = device_type,
            TpmAdapterOption::OwnerAuth(owner_auth) => self.owner_auth = owner_auth,
            TpmAdapterOption::UserData(user_data) => self.user_data = user_data,
            TpmAdapterOption::Factory(factory) => self.factory = factory,
        }
        Ok(())
    }

    pub fn ak_handle(&self) -> u32 {
        self.ak_handle
    }

    pub fn pcr_selections(&self) -> &[PcrSelection] {
        &self.pcr_selections
    }

    pub fn device_type(&self) -> TpmDeviceType {
        self.device_type
    }

    /// Open the device, quote over `nonce_hash` and read the selected PCRs.
    fn quote(&self, nonce_hash: &[u8]) -> Result<(Vec<u8>, Vec<u8>, Vec<u8>), AdapterError> {
        let _guard = self
            .device_lock
            .try_lock_for(Duration::from_secs(DEVICE_LOCK_TIMEOUT))
            .ok_or_else(|| AdapterError::Hardware("TPM device lock acquire timeout".to_string()))?;

        let mut tpm = self.factory.open(self.device_type, &self.owner_auth).map_err(|e| {
            error!("Failed to open TPM device {}: {}", self.device_type, e);
            e
        })?;
        let (quote, signature) = tpm
            .get_quote(self.ak_handle, nonce_hash, &self.pcr_selections)
            .map_err(|e| AdapterError::Hardware(format!("Failed to get quote using AK handle {:#x}: {}", self.ak_handle, e)))?;
        let pcrs = tpm.get_pcrs(&self.pcr_selections)?;
        Ok((quote, signature, pcrs))
    }
}

impl CompositeAdapter for TpmAdapter {
    fn get_evidence_identifier(&self) -> String {
        TPM_EVIDENCE_IDENTIFIER.to_string()
    }

    fn get_evidence(&self, verifier_nonce: Option<&Nonce>, user_data: &[u8]) -> Result<Value, AdapterError> {
        let nonce_hash = create_nonce_hash(verifier_nonce, user_data);
        let (quote, signature, pcrs) = self.quote(&nonce_hash)?;
        info!("TPM quote collected ({} bytes)", quote.len());

        let evidence = TpmEvidence { quote, signature, pcrs, user_data, verifier_nonce };
        Ok(serde_json::to_value(evidence)?)
    }
}

impl EvidenceAdapter for TpmAdapter {
    fn get_evidence_identifier(&self) -> String {
        TPM_EVIDENCE_IDENTIFIER.to_string()
    }

    fn collect_evidence(&self, nonce: &[u8]) -> Result<Evidence, AdapterError> {
        let mut hasher = Sha256::new();
        hasher.update(nonce);
        hasher.update(&self.user_data);
        let (quote, signature, pcrs) = self.quote(&hasher.finish())?;

        let evidence = TpmEvidence { quote, signature, pcrs, user_data: &[], verifier_nonce: None };
        Ok(Evidence::structured(TPM_EVIDENCE_IDENTIFIER, serde_json::to_value(evidence)?)
            .with_user_data(self.user_data.clone()))
    }
}
