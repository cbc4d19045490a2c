#![allow(dead_code)]

use warden_crypto::LocalSigner;
use warden_wallet::{
    Amount, AuthorizationEngine, AuthorizationOutcome, Call, EngineParts, ExecutionContext,
    Identity, InMemoryExecutor, InitParams, MemorySink, MessageHash, Operation, Origin,
    SignatureEntry, SignatureSet, Submission, Timestamp, Token, WalletConfig,
};

pub const DAY: Timestamp = 86_400;

pub fn id(n: u64) -> Identity {
    Identity::from_low_u64(n)
}

pub fn transfer(to: u64, amount: Amount) -> Call {
    Call::Transfer {
        token: Token::Native,
        to: id(to),
        amount,
    }
}

pub fn spend(to: u64, amount: Amount) -> Operation {
    Operation::Execute {
        call: transfer(to, amount),
    }
}

/// Sign `hash` with every signer and sort the result by identity.
pub fn sign_all(hash: &MessageHash, signers: &[&LocalSigner]) -> SignatureSet {
    let mut entries: Vec<SignatureEntry> = signers
        .iter()
        .map(|s| SignatureEntry {
            signer: s.identity(),
            signature: s.sign_hash(hash).unwrap(),
        })
        .collect();
    entries.sort_by(|a, b| a.signer.cmp(&b.signer));
    SignatureSet::new(entries)
}

/// One initialized wallet with an owner, two guardians (`g1 < g2`), an entry
/// point and an inheritor.
pub struct Fixture {
    pub engine: AuthorizationEngine,
    pub owner: LocalSigner,
    pub g1: LocalSigner,
    pub g2: LocalSigner,
    pub executor: InMemoryExecutor,
    pub sink: MemorySink,
    pub entry_point: Identity,
    pub inheritor: Identity,
    nonce: u64,
}

impl Fixture {
    pub fn new(limit: Amount) -> Self {
        Self::build(limit, true, WalletConfig::default())
    }

    pub fn without_guardians(limit: Amount) -> Self {
        Self::build(limit, false, WalletConfig::default())
    }

    pub fn with_config(limit: Amount, config: WalletConfig) -> Self {
        Self::build(limit, true, config)
    }

    fn build(limit: Amount, with_guardians: bool, config: WalletConfig) -> Self {
        let owner = LocalSigner::for_label("fixture-owner");
        let mut pair = [
            LocalSigner::for_label("fixture-guardian-1"),
            LocalSigner::for_label("fixture-guardian-2"),
        ];
        pair.sort_by_key(|g| g.identity());
        let [g1, g2] = pair;

        let executor = InMemoryExecutor::new();
        let sink = MemorySink::new();
        let entry_point = id(0xE0);
        let inheritor = id(0xE1);

        let parts = EngineParts::with_config(config)
            .executor(executor.clone())
            .sink(sink.clone());
        let mut engine =
            AuthorizationEngine::new(ExecutionContext::Proxy(id(0xB0B)), id(0xA11CE), parts).unwrap();

        let guardians = if with_guardians {
            vec![g1.identity(), g2.identity()]
        } else {
            Vec::new()
        };
        engine
            .initialize(
                InitParams {
                    owner: owner.identity(),
                    guardians,
                    quota: limit,
                    entry_point,
                    inheritor: Some(inheritor),
                },
                0,
            )
            .unwrap();

        Self {
            engine,
            owner,
            g1,
            g2,
            executor,
            sink,
            entry_point,
            inheritor,
            nonce: 0,
        }
    }

    pub fn next_nonce(&mut self) -> u64 {
        self.nonce += 1;
        self.nonce
    }

    /// Build a submission from `origin` signed by `signers`.
    pub fn signed_from(&mut self, origin: Origin, operation: Operation, signers: &[&LocalSigner]) -> Submission {
        let nonce = self.next_nonce();
        let submission = Submission::new(origin, operation, nonce);
        let hash = self.engine.signing_hash(&submission).unwrap();
        submission.with_signatures(sign_all(&hash, signers))
    }

    /// Build a submission relayed by the bound entry point.
    pub fn relayed(&mut self, operation: Operation, signers: &[&LocalSigner]) -> Submission {
        let origin = Origin::Relayed {
            relayer: self.entry_point,
        };
        self.signed_from(origin, operation, signers)
    }

    pub fn submit(&mut self, operation: Operation, signers: &[LocalSigner], now: Timestamp) -> AuthorizationOutcome {
        let refs: Vec<&LocalSigner> = signers.iter().collect();
        let submission = self.relayed(operation, &refs);
        self.engine.submit(submission, now)
    }

    pub fn direct(&mut self, caller: Identity, operation: Operation, now: Timestamp) -> AuthorizationOutcome {
        let nonce = self.next_nonce();
        let submission = Submission::new(Origin::Direct { caller }, operation, nonce);
        self.engine.submit(submission, now)
    }

    pub fn owner(&self) -> LocalSigner {
        self.owner.clone()
    }

    pub fn guardians(&self) -> [LocalSigner; 2] {
        [self.g1.clone(), self.g2.clone()]
    }

    pub fn is_locked(&self) -> bool {
        self.engine.wallet().map(|w| w.is_locked()).unwrap_or(false)
    }

    pub fn consumed(&self) -> Amount {
        self.engine.wallet().map(|w| w.quota().consumed()).unwrap_or(0)
    }
}
