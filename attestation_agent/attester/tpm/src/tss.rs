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

// tss-esapi backed TPM access
use crate::device::TpmDeviceType;
use crate::pcr::{PcrHashAlg, PcrSelection};
use crate::provider::{TpmFactory, TpmQuoteProvider};
use connector::AdapterError;
use log::debug;
use std::io::Error as IoError;
use std::str::FromStr;
use tss_esapi::{
    abstraction::pcr,
    constants::response_code::Tss2ResponseCode,
    handles::{KeyHandle, ObjectHandle, PersistentTpmHandle, TpmHandle},
    interface_types::algorithm::HashingAlgorithm,
    structures::{Auth, Data, PcrSelectionList, PcrSelectionListBuilder, PcrSlot, SignatureScheme},
    tcti_ldr::TctiNameConf,
    traits::Marshall,
    Context,
};

const MAX_QUOTE_NONCE_SIZE: usize = 32;

fn hash_alg(alg: PcrHashAlg) -> HashingAlgorithm {
    match alg {
        PcrHashAlg::Sha1 => HashingAlgorithm::Sha1,
        PcrHashAlg::Sha256 => HashingAlgorithm::Sha256,
        PcrHashAlg::Sha384 => HashingAlgorithm::Sha384,
        PcrHashAlg::Sha512 => HashingAlgorithm::Sha512,
        PcrHashAlg::Sm3 => HashingAlgorithm::Sm3_256,
    }
}

fn pcr_slot(index: u8) -> Result<PcrSlot, AdapterError> {
    let slot = match index {
        0 => PcrSlot::Slot0,
        1 => PcrSlot::Slot1,
        2 => PcrSlot::Slot2,
        3 => PcrSlot::Slot3,
        4 => PcrSlot::Slot4,
        5 => PcrSlot::Slot5,
        6 => PcrSlot::Slot6,
        7 => PcrSlot::Slot7,
        8 => PcrSlot::Slot8,
        9 => PcrSlot::Slot9,
        10 => PcrSlot::Slot10,
        11 => PcrSlot::Slot11,
        12 => PcrSlot::Slot12,
        13 => PcrSlot::Slot13,
        14 => PcrSlot::Slot14,
        15 => PcrSlot::Slot15,
        16 => PcrSlot::Slot16,
        17 => PcrSlot::Slot17,
        18 => PcrSlot::Slot18,
        19 => PcrSlot::Slot19,
        20 => PcrSlot::Slot20,
        21 => PcrSlot::Slot21,
        22 => PcrSlot::Slot22,
        23 => PcrSlot::Slot23,
        _ => return Err(AdapterError::Configuration(format!("Invalid PCR index {}", index))),
    };
    Ok(slot)
}

fn selection_list(selections: &[PcrSelection]) -> Result<PcrSelectionList, AdapterError> {
    let mut builder = PcrSelectionListBuilder::new();
    for selection in selections {
        let slots = selection.pcrs.iter().map(|&index| pcr_slot(index)).collect::<Result<Vec<_>, _>>()?;
        builder = builder.with_selection(hash_alg(selection.hash), &slots);
    }
    builder
        .build()
        .map_err(|e| AdapterError::Configuration(format!("Failed to create PCR selection list: {}", e)))
}

/// Opens the TPM through the TSS2 ESAPI.
#[derive(Debug, Default, Clone, Copy)]
pub struct TssTpmFactory;

impl TpmFactory for TssTpmFactory {
    fn open(&self, device_type: TpmDeviceType, owner_auth: &str) -> Result<Box<dyn TpmQuoteProvider>, AdapterError> {
        debug!("Opening TPM device {}", device_type);
        let tcti = TctiNameConf::from_str(device_type.tcti_name())
            .map_err(|e| AdapterError::Configuration(format!("Failed to create TCTI: {}", e)))?;
        let mut context = Context::new(tcti).map_err(|e| match e {
            tss_esapi::Error::Tss2Error(Tss2ResponseCode::FormatZero(response_code)) => AdapterError::Hardware(format!(
                "TPM error details: response code {:x}, system error: {}",
                response_code.0,
                IoError::last_os_error()
            )),
            _ => AdapterError::Hardware(format!("Failed to create TPM context: {}", e)),
        })?;

        if !owner_auth.is_empty() {
            let auth = Auth::try_from(owner_auth.as_bytes().to_vec())
                .map_err(|e| AdapterError::Configuration(format!("Invalid owner auth: {}", e)))?;
            context
                .tr_set_auth(ObjectHandle::Owner, auth)
                .map_err(|e| AdapterError::Hardware(format!("Failed to set owner auth: {}", e)))?;
        }
        Ok(Box::new(TssTpm { context }))
    }
}

pub struct TssTpm {
    context: Context,
}

impl TpmQuoteProvider for TssTpm {
    fn get_quote(
        &mut self,
        ak_handle: u32,
        nonce_hash: &[u8],
        selections: &[PcrSelection],
    ) -> Result<(Vec<u8>, Vec<u8>), AdapterError> {
        // Qualifying data is capped at a SHA-256 digest
        let nonce = &nonce_hash[..std::cmp::min(nonce_hash.len(), MAX_QUOTE_NONCE_SIZE)];

        let persistent_handle = PersistentTpmHandle::new(ak_handle)
            .map_err(|e| AdapterError::Configuration(format!("Invalid AK handle value: {}", e)))?;
        let ak_handle: KeyHandle = self
            .context
            .tr_from_tpm_public(TpmHandle::Persistent(persistent_handle))
            .map_err(|e| AdapterError::Hardware(format!("Failed to get AK handle from TPM: {}", e)))?
            .into();

        let qualifying_data = Data::try_from(nonce.to_vec())
            .map_err(|e| AdapterError::Input(format!("Failed to create qualifying data: {}", e)))?;
        let pcr_selection_list = selection_list(selections)?;

        let (quote, signature) = self
            .context
            .execute_with_nullauth_session(|ctx| {
                ctx.quote(ak_handle, qualifying_data, SignatureScheme::Null, pcr_selection_list)
            })
            .map_err(|e| AdapterError::Hardware(format!("Failed to get quote from TPM: {}", e)))?;

        let quote_bytes =
            quote.marshall().map_err(|e| AdapterError::Serialization(format!("Failed to marshall quote: {}", e)))?;
        let signature_bytes = signature
            .marshall()
            .map_err(|e| AdapterError::Serialization(format!("Failed to marshall signature: {}", e)))?;
        Ok((quote_bytes, signature_bytes))
    }

    fn get_pcrs(&mut self, selections: &[PcrSelection]) -> Result<Vec<u8>, AdapterError> {
        let pcr_selection_list = selection_list(selections)?;
        let pcr_data = pcr::read_all(&mut self.context, pcr_selection_list)
            .map_err(|e| AdapterError::Hardware(format!("Failed to read PCR values: {}", e)))?;

        let mut values = Vec::new();
        for selection in selections {
            let bank = pcr_data.pcr_bank(hash_alg(selection.hash)).ok_or_else(|| {
                AdapterError::Hardware(format!("PCR bank {} is not available on the TPM", selection.hash))
            })?;
            for index in selection.sorted_pcrs() {
                let digest = bank
                    .get_digest(pcr_slot(index)?)
                    .ok_or_else(|| AdapterError::Hardware(format!("PCR {} missing from bank {}", index, selection.hash)))?;
                values.extend_from_slice(digest.value());
            }
        }
        Ok(values)
    }
}
