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

//! TPM evidence adapter.

pub mod adapter;
pub mod device;
pub mod pcr;
pub mod provider;
pub mod tss;

pub use adapter::{
    with_ak_handle, with_device_type, with_owner_auth, with_pcr_selections, with_tpm_factory, with_user_data,
    TpmAdapter, TpmAdapterOption, AK_HANDLE_RANGE, DEFAULT_AK_HANDLE, TPM_EVIDENCE_IDENTIFIER,
};
pub use device::TpmDeviceType;
pub use pcr::{default_pcr_selections, parse_pcr_selections, PcrHashAlg, PcrSelection};
pub use provider::{TpmFactory, TpmQuoteProvider};
pub use tss::TssTpmFactory;
