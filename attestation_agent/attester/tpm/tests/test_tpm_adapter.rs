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

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use connector::{create_nonce_hash, AdapterError, CompositeAdapter, EvidenceAdapter, EvidencePayload, Nonce};
use mockall::mock;
use openssl::sha::sha256;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tpm_attester::{
    parse_pcr_selections, with_ak_handle, with_pcr_selections, with_tpm_factory, with_user_data, PcrSelection,
    TpmAdapter, TpmDeviceType, TpmFactory, TpmQuoteProvider,
};

mock! {
    pub Provider {}
    impl TpmQuoteProvider for Provider {
        fn get_quote(
            &mut self,
            ak_handle: u32,
            nonce_hash: &[u8],
            selections: &[PcrSelection],
        ) -> Result<(Vec<u8>, Vec<u8>), AdapterError>;
        fn get_pcrs(&mut self, selections: &[PcrSelection]) -> Result<Vec<u8>, AdapterError>;
    }
}

mock! {
    pub Factory {}
    impl TpmFactory for Factory {
        fn open(&self, device_type: TpmDeviceType, owner_auth: &str) -> Result<Box<dyn TpmQuoteProvider>, AdapterError>;
    }
}

fn nonce() -> Nonce {
    Nonce::new(b"val".to_vec(), b"iat".to_vec(), b"sig".to_vec())
}

fn provider_expecting(expected_hash: [u8; 32]) -> MockProvider {
    let mut provider = MockProvider::new();
    provider
        .expect_get_quote()
        .withf(move |handle, hash, _| *handle == 0x8100_0001 && hash == expected_hash.as_slice())
        .times(1)
        .returning(|_, _, _| Ok((b"quote".to_vec(), b"signature".to_vec())));
    provider.expect_get_pcrs().times(1).returning(|_| Ok(vec![0xAA; 32]));
    provider
}

#[test]
fn test_composite_evidence_binds_nonce_and_user_data() {
    let expected_hash = create_nonce_hash(Some(&nonce()), b"user");
    let mut factory = MockFactory::new();
    factory
        .expect_open()
        .withf(|device, auth| *device == TpmDeviceType::Linux && auth.is_empty())
        .times(1)
        .returning(move |_, _| Ok(Box::new(provider_expecting(expected_hash))));

    let adapter = TpmAdapter::new(vec![with_ak_handle(0x8100_0001), with_tpm_factory(Arc::new(factory))]).unwrap();
    let evidence = CompositeAdapter::get_evidence(&adapter, Some(&nonce()), b"user").unwrap();

    assert_eq!(evidence["quote"], STANDARD.encode(b"quote"));
    assert_eq!(evidence["signature"], STANDARD.encode(b"signature"));
    assert_eq!(evidence["pcrs"], STANDARD.encode([0xAA; 32]));
    assert_eq!(evidence["user_data"], STANDARD.encode(b"user"));
    assert_eq!(evidence["verifier_nonce"]["val"], STANDARD.encode(b"val"));
}

#[test]
fn test_composite_evidence_without_nonce_omits_optional_fields() {
    let expected_hash = sha256(b"");
    let mut factory = MockFactory::new();
    factory.expect_open().returning(move |_, _| Ok(Box::new(provider_expecting(expected_hash))));

    let adapter = TpmAdapter::new(vec![with_ak_handle(0x8100_0001), with_tpm_factory(Arc::new(factory))]).unwrap();
    let evidence = CompositeAdapter::get_evidence(&adapter, None, &[]).unwrap();

    assert!(evidence.get("user_data").is_none());
    assert!(evidence.get("verifier_nonce").is_none());
}

#[test]
fn test_device_open_failure_is_returned() {
    let mut factory = MockFactory::new();
    factory
        .expect_open()
        .returning(|_, _| Err(AdapterError::Hardware("No such file or directory".to_string())));

    let adapter = TpmAdapter::new(vec![with_tpm_factory(Arc::new(factory))]).unwrap();
    let err = CompositeAdapter::get_evidence(&adapter, Some(&nonce()), &[]).unwrap_err();
    assert!(matches!(err, AdapterError::Hardware(msg) if msg.contains("No such file")));
}

#[test]
fn test_quote_failure_names_ak_handle() {
    let mut factory = MockFactory::new();
    factory.expect_open().returning(|_, _| {
        let mut provider = MockProvider::new();
        provider
            .expect_get_quote()
            .returning(|_, _, _| Err(AdapterError::Hardware("handle not found".to_string())));
        provider.expect_get_pcrs().never();
        Ok(Box::new(provider))
    });

    let adapter = TpmAdapter::new(vec![with_ak_handle(0x8100_0002), with_tpm_factory(Arc::new(factory))]).unwrap();
    let err = CompositeAdapter::get_evidence(&adapter, Some(&nonce()), &[]).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("0x81000002"));
    assert!(msg.contains("handle not found"));
}

#[test]
fn test_selected_pcrs_are_passed_to_provider() {
    let selections = parse_pcr_selections("sha256:0,7+sha1:1").unwrap();
    let expected = selections.clone();
    let mut factory = MockFactory::new();
    factory.expect_open().returning(move |_, _| {
        let mut provider = MockProvider::new();
        let quote_selection = expected.clone();
        let pcr_selection = expected.clone();
        provider
            .expect_get_quote()
            .withf(move |_, _, selections| selections == quote_selection.as_slice())
            .returning(|_, _, _| Ok((vec![1], vec![2])));
        provider
            .expect_get_pcrs()
            .withf(move |selections| selections == pcr_selection.as_slice())
            .returning(|_| Ok(vec![3]));
        Ok(Box::new(provider))
    });

    let adapter = TpmAdapter::new(vec![with_pcr_selections(selections), with_tpm_factory(Arc::new(factory))]).unwrap();
    assert!(CompositeAdapter::get_evidence(&adapter, None, b"data").is_ok());
}

#[test]
fn test_legacy_evidence_hashes_nonce_then_user_data() {
    let expected_hash = sha256(b"raw-nonceuser");
    let mut factory = MockFactory::new();
    factory.expect_open().returning(move |_, _| Ok(Box::new(provider_expecting(expected_hash))));

    let adapter = TpmAdapter::new(vec![
        with_ak_handle(0x8100_0001),
        with_user_data(b"user".to_vec()),
        with_tpm_factory(Arc::new(factory)),
    ])
    .unwrap();
    let evidence = EvidenceAdapter::collect_evidence(&adapter, b"raw-nonce").unwrap();

    assert_eq!(evidence.identifier, "tpm");
    assert_eq!(evidence.user_data, b"user");
    match evidence.payload {
        EvidencePayload::Structured(value) => assert_eq!(value["quote"], STANDARD.encode(b"quote")),
        other => panic!("unexpected payload: {:?}", other),
    }
}

struct TrackingProvider {
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    fail: bool,
}

impl TpmQuoteProvider for TrackingProvider {
    fn get_quote(&mut self, _: u32, _: &[u8], _: &[PcrSelection]) -> Result<(Vec<u8>, Vec<u8>), AdapterError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(20));
        self.active.fetch_sub(1, Ordering::SeqCst);
        if self.fail {
            return Err(AdapterError::Hardware("quote failed".to_string()));
        }
        Ok((vec![1], vec![2]))
    }

    fn get_pcrs(&mut self, _: &[PcrSelection]) -> Result<Vec<u8>, AdapterError> {
        Ok(vec![3])
    }
}

impl Drop for TrackingProvider {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct TrackingFactory {
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    fail: bool,
}

impl TpmFactory for TrackingFactory {
    fn open(&self, _: TpmDeviceType, _: &str) -> Result<Box<dyn TpmQuoteProvider>, AdapterError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(TrackingProvider {
            active: self.active.clone(),
            max_active: self.max_active.clone(),
            closed: self.closed.clone(),
            fail: self.fail,
        }))
    }
}

#[test]
fn test_device_is_closed_on_every_path() {
    let factory = Arc::new(TrackingFactory { fail: true, ..Default::default() });
    let adapter = TpmAdapter::new(vec![with_tpm_factory(factory.clone())]).unwrap();

    assert!(CompositeAdapter::get_evidence(&adapter, Some(&nonce()), &[]).is_err());
    assert_eq!(factory.opened.load(Ordering::SeqCst), 1);
    assert_eq!(factory.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_concurrent_collections_are_serialized() {
    let factory = Arc::new(TrackingFactory::default());
    let adapter = Arc::new(TpmAdapter::new(vec![with_tpm_factory(factory.clone())]).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let adapter = adapter.clone();
            thread::spawn(move || CompositeAdapter::get_evidence(adapter.as_ref(), Some(&nonce()), &[]).is_ok())
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    assert_eq!(factory.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(factory.opened.load(Ordering::SeqCst), 4);
    assert_eq!(factory.closed.load(Ordering::SeqCst), 4);
}
