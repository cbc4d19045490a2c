use warden_crypto::{hash_object, LocalSigner, RecoveryError, Secp256k1Recovery, SignerRecovery};

#[derive(serde::Serialize)]
struct Approval<'a> {
    wallet: &'a str,
    nonce: u64,
}

#[test]
fn test_signers_recover_through_trait_object() {
    let recovery: Box<dyn SignerRecovery> = Box::new(Secp256k1Recovery);
    let hash = hash_object(&Approval { wallet: "w-1", nonce: 7 }).unwrap();

    for label in ["owner", "guardian-a", "guardian-b"] {
        let signer = LocalSigner::for_label(label);
        let sig = signer.sign_hash(&hash).unwrap();
        assert_eq!(recovery.recover_signer(&hash, &sig).unwrap(), signer.identity());
    }
}

#[test]
fn test_flipped_signature_byte_never_recovers_signer() {
    let signer = LocalSigner::for_label("owner");
    let hash = hash_object(&Approval { wallet: "w-1", nonce: 8 }).unwrap();
    let mut sig = signer.sign_hash(&hash).unwrap();
    sig[10] ^= 0xff;

    match Secp256k1Recovery.recover_signer(&hash, &sig) {
        Ok(identity) => assert_ne!(identity, signer.identity()),
        Err(e) => assert!(matches!(
            e,
            RecoveryError::RecoveryFailed | RecoveryError::MalformedSignature(_)
        )),
    }
}
