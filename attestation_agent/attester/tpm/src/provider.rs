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
use crate::pcr::PcrSelection;
use connector::AdapterError;

/// Quote and PCR operations on an open TPM.
///
/// The device stays open for the lifetime of the provider and is closed when
/// it is dropped.
pub trait TpmQuoteProvider {
    /// Returns the marshalled `TPMS_ATTEST` quote and `TPMT_SIGNATURE`.
    fn get_quote(
        &mut self,
        ak_handle: u32,
        nonce_hash: &[u8],
        selections: &[PcrSelection],
    ) -> Result<(Vec<u8>, Vec<u8>), AdapterError>;

    /// Returns the selected PCR digests concatenated in selection order,
    /// ascending index within each bank.
    fn get_pcrs(&mut self, selections: &[PcrSelection]) -> Result<Vec<u8>, AdapterError>;
}

/// Opens a TPM for one evidence collection.
pub trait TpmFactory: Send + Sync {
    fn open(&self, device_type: TpmDeviceType, owner_auth: &str) -> Result<Box<dyn TpmQuoteProvider>, AdapterError>;
}
