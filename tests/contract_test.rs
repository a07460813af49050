//! Bound contract handle behavior against a scripted backend

mod common;

use std::sync::Arc;

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256, U256};
use hitch::{BoundContract, Capability, Error, Schema};

use common::MockBackend;

const ABI: &str = r#"[
    {"type":"function","name":"balanceOf","inputs":[{"name":"owner","type":"address"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
    {"type":"function","name":"transfer","inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],"outputs":[{"name":"","type":"bool"}],"stateMutability":"nonpayable"},
    {"type":"event","name":"Transfer","inputs":[{"name":"from","type":"address","indexed":true},{"name":"to","type":"address","indexed":true},{"name":"value","type":"uint256","indexed":false}],"anonymous":false}
]"#;

fn contract_with(backend: Arc<MockBackend>) -> BoundContract {
    let schema = Arc::new(Schema::parse(ABI).unwrap());
    BoundContract::builder(Address::repeat_byte(0x42), schema)
        .backend(backend)
        .build()
}

#[tokio::test]
async fn test_call_encodes_dispatches_decodes() {
    let backend = Arc::new(MockBackend::new());
    backend.push_call_response(
        DynSolValue::Uint(U256::from(12345u64), 256)
            .abi_encode()
            .into(),
    );
    let contract = contract_with(backend.clone());

    let owner = Address::repeat_byte(0x99);
    let out = contract
        .call("balanceOf", &[DynSolValue::Address(owner)])
        .await
        .unwrap();

    assert_eq!(out, vec![DynSolValue::Uint(U256::from(12345u64), 256)]);

    // The backend saw the bound address and selector-prefixed calldata.
    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, Address::repeat_byte(0x42));
    // balanceOf(address) -> 0x70a08231
    assert_eq!(&calls[0].1[..4], &[0x70, 0xa0, 0x82, 0x31]);
}

#[tokio::test]
async fn test_call_transport_error_propagates() {
    let backend = Arc::new(MockBackend::new());
    backend.push_call_error("connection refused");
    let contract = contract_with(backend);

    let err = contract
        .call("balanceOf", &[DynSolValue::Address(Address::ZERO)])
        .await
        .unwrap_err();

    match err {
        Error::Transport(inner) => assert!(inner.to_string().contains("connection refused")),
        other => panic!("expected Transport, got {other}"),
    }
}

#[tokio::test]
async fn test_call_schema_mismatch_before_dispatch() {
    let backend = Arc::new(MockBackend::new());
    let contract = contract_with(backend.clone());

    let err = contract.call("balanceOf", &[]).await.unwrap_err();
    assert!(matches!(err, Error::SchemaMismatch { .. }));
    // Nothing reached the transport.
    assert!(backend.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_transact_returns_pending_handle() {
    let backend = Arc::new(MockBackend::new());
    let contract = contract_with(backend.clone());

    let pending = contract
        .transact(
            "transfer",
            &[
                DynSolValue::Address(Address::repeat_byte(0x01)),
                DynSolValue::Uint(U256::from(10u64), 256),
            ],
        )
        .await
        .unwrap();

    // The handle tracks the submission; no output decoding happens.
    assert_ne!(pending.tx_hash, B256::default());

    let sent = backend.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].2, U256::ZERO);
    // transfer(address,uint256) -> 0xa9059cbb
    assert_eq!(&sent[0].1[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
}

#[tokio::test]
async fn test_transact_with_value_carries_value() {
    let backend = Arc::new(MockBackend::new());
    let contract = contract_with(backend.clone());

    contract
        .transact_with_value(
            "transfer",
            &[
                DynSolValue::Address(Address::repeat_byte(0x01)),
                DynSolValue::Uint(U256::from(10u64), 256),
            ],
            U256::from(777u64),
        )
        .await
        .unwrap();

    assert_eq!(backend.sent.lock().unwrap()[0].2, U256::from(777u64));
}

#[tokio::test]
async fn test_missing_capabilities_reported_individually() {
    let schema = Arc::new(Schema::parse(ABI).unwrap());
    let backend = Arc::new(MockBackend::new());

    // Bound read-only: transact must fail, call must work.
    let contract = BoundContract::builder(Address::repeat_byte(0x42), schema)
        .caller(backend.clone())
        .build();
    assert!(contract.can_call());
    assert!(!contract.can_transact());
    assert!(!contract.can_filter());

    let err = contract.transact("transfer", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        Error::NoBackend {
            capability: Capability::Transact
        }
    ));

    let err = contract
        .watch_logs("Transfer", &[], tokio::sync::mpsc::channel(1).0)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::NoBackend {
            capability: Capability::Filter
        }
    ));
}
