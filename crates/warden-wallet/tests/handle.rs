use warden_crypto::LocalSigner;
use warden_wallet::{
    AuthorizationEngine, Call, EngineParts, ErrorCode, ExecutionContext, Identity,
    InMemoryExecutor, InitParams, Operation, Origin, Submission, Token, WalletHandle,
};

async fn build_handle(owner: &LocalSigner, executor: InMemoryExecutor) -> WalletHandle {
    let engine = AuthorizationEngine::new(
        ExecutionContext::Proxy(Identity::from_low_u64(0xB0B)),
        Identity::from_low_u64(0xA11CE),
        EngineParts::default().executor(executor),
    )
    .unwrap();
    let handle = WalletHandle::new(engine);

    let params = InitParams {
        owner: owner.identity(),
        guardians: vec![Identity::from_low_u64(0x61)],
        quota: 55,
        entry_point: Identity::from_low_u64(0xE0),
        inheritor: None,
    };
    handle.initialize(params, 0).await.unwrap();
    handle
}

fn spend(amount: u128) -> Operation {
    Operation::Execute {
        call: Call::Transfer {
            token: Token::Native,
            to: Identity::from_low_u64(0x77),
            amount,
        },
    }
}

#[tokio::test]
async fn test_concurrent_submissions_are_serialized() {
    let owner = LocalSigner::for_label("handle-owner");
    let executor = InMemoryExecutor::new();
    let handle = build_handle(&owner, executor.clone()).await;

    let mut tasks = Vec::new();
    for nonce in 1..=8u64 {
        let handle = handle.clone();
        let caller = owner.identity();
        tasks.push(tokio::spawn(async move {
            let submission = Submission::new(Origin::Direct { caller }, spend(10), nonce);
            handle.submit(submission, 1).await
        }));
    }

    let mut committed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => committed += 1,
            Err(e) => assert!(
                matches!(e.code(), ErrorCode::InvalidOrdering | ErrorCode::QuotaExceeded),
                "unexpected rejection {e}"
            ),
        }
    }

    assert!(committed >= 1);
    assert!(committed <= 5);

    let wallet = handle.snapshot().await.unwrap();
    assert_eq!(wallet.quota().consumed(), 10 * committed as u128);
    assert_eq!(executor.executed().len(), committed);
}

#[tokio::test]
async fn test_signing_hash_through_handle() {
    let owner = LocalSigner::for_label("handle-owner");
    let handle = build_handle(&owner, InMemoryExecutor::new()).await;

    let submission = Submission::new(Origin::Direct { caller: owner.identity() }, spend(1), 1);
    let a = handle.signing_hash(&submission).await.unwrap();
    let b = handle.signing_hash(&submission).await.unwrap();
    assert_eq!(a, b);

    assert!(handle.tick(5).await.unwrap().is_empty());
    assert_eq!(handle.snapshot().await.unwrap().last_seen(), 5);
}
