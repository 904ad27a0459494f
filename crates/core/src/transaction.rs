//! Transfer transactions and their signatures.

use crate::crypto::{Keypair, PublicKey, Signature};
use crate::hash::{hash_encoded, Hash};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_secs()
}

/// A transfer of `amount` from `sender` to `receiver`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: u64,
    /// Creation time, Unix seconds.
    pub timestamp: u64,
    /// Identity digest over sender, receiver, amount and timestamp.
    pub hash: Hash,
    /// Signature over sender, receiver and amount.
    pub signature: Option<Signature>,
}

#[derive(Serialize)]
struct IdentityFields<'a> {
    sender: &'a str,
    receiver: &'a str,
    amount: u64,
    timestamp: u64,
}

#[derive(Serialize)]
struct SigningFields<'a> {
    sender: &'a str,
    receiver: &'a str,
    amount: u64,
}

impl Transaction {
    /// Create an unsigned transaction with an explicit timestamp.
    pub fn create(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
        timestamp: u64,
    ) -> Self {
        let mut tx = Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            timestamp,
            hash: Hash::ZERO,
            signature: None,
        };
        tx.hash = tx.compute_hash();
        tx
    }

    /// Create an unsigned transaction stamped with the current time.
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, amount: u64) -> Self {
        Self::create(sender, receiver, amount, current_timestamp())
    }

    /// Block reward paid by the issuing account to the selected validator.
    pub fn reward(issuer: &str, validator: &str, amount: u64, timestamp: u64) -> Self {
        Self::create(issuer, validator, amount, timestamp)
    }

    /// Recompute the identity digest from the current field values.
    pub fn compute_hash(&self) -> Hash {
        hash_encoded(&IdentityFields {
            sender: &self.sender,
            receiver: &self.receiver,
            amount: self.amount,
            timestamp: self.timestamp,
        })
    }

    /// Whether the stored digest still matches the fields.
    pub fn verify_hash(&self) -> bool {
        self.hash == self.compute_hash()
    }

    /// Bytes covered by the signature. The timestamp is not signed.
    pub fn signing_bytes(&self) -> Vec<u8> {
        bincode::serialize(&SigningFields {
            sender: &self.sender,
            receiver: &self.receiver,
            amount: self.amount,
        })
        .expect("serialization should not fail")
    }

    pub fn sign(&mut self, keypair: &Keypair) {
        self.signature = Some(keypair.sign(&self.signing_bytes()));
    }

    /// Builder form of [`Transaction::sign`].
    pub fn signed(mut self, keypair: &Keypair) -> Self {
        self.sign(keypair);
        self
    }

    /// Check the signature against `public_key`.
    ///
    /// Fails closed: an absent or malformed signature is reported exactly
    /// like a mismatched one.
    pub fn verify(&self, public_key: &PublicKey) -> bool {
        match &self.signature {
            Some(sig) => public_key.verify(&self.signing_bytes(), sig).is_ok(),
            None => false,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}: {} ({})",
            self.sender,
            self.receiver,
            self.amount,
            self.hash.short()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_sets_identity_hash() {
        let tx = Transaction::create("Alice", "Bob", 20, 1_700_000_000);
        assert!(tx.verify_hash());
        assert_eq!(tx.hash, tx.compute_hash());
        assert!(!tx.is_signed());
    }

    #[test]
    fn test_hash_covers_every_field() {
        let base = Transaction::create("Alice", "Bob", 20, 100);
        assert_ne!(base.hash, Transaction::create("Alicia", "Bob", 20, 100).hash);
        assert_ne!(base.hash, Transaction::create("Alice", "Rob", 20, 100).hash);
        assert_ne!(base.hash, Transaction::create("Alice", "Bob", 21, 100).hash);
        assert_ne!(base.hash, Transaction::create("Alice", "Bob", 20, 101).hash);
    }

    #[test]
    fn test_mutation_breaks_hash() {
        let mut tx = Transaction::create("Alice", "Bob", 20, 100);
        tx.amount = 2000;
        assert!(!tx.verify_hash());
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = Keypair::generate();
        let tx = Transaction::new("Alice", "Bob", 20).signed(&keypair);
        assert!(tx.verify(&keypair.public_key));
    }

    #[test]
    fn test_signature_ignores_timestamp() {
        let keypair = Keypair::generate();
        let mut tx = Transaction::create("Alice", "Bob", 20, 1).signed(&keypair);
        tx.timestamp = 2;
        assert!(tx.verify(&keypair.public_key));
    }

    #[test]
    fn test_verify_fails_closed() {
        let keypair = Keypair::generate();
        let other = Keypair::generate();

        let unsigned = Transaction::new("Alice", "Bob", 20);
        assert!(!unsigned.verify(&keypair.public_key));

        let signed = Transaction::new("Alice", "Bob", 20).signed(&keypair);
        assert!(!signed.verify(&other.public_key));

        let mut forged = signed.clone();
        forged.signature = Some(Signature::from_bytes([7u8; 64]));
        assert!(!forged.verify(&keypair.public_key));

        let mut altered = signed;
        altered.amount = 999;
        assert!(!altered.verify(&keypair.public_key));
    }

    #[test]
    fn test_reward_transaction() {
        let tx = Transaction::reward("System", "Alice", 10, 5);
        assert_eq!(tx.sender, "System");
        assert_eq!(tx.receiver, "Alice");
        assert_eq!(tx.amount, 10);
        assert!(tx.verify_hash());
    }

    #[test]
    fn test_json_roundtrip_keeps_signature() {
        let keypair = Keypair::generate();
        let tx = Transaction::new("Alice", "Bob", 20).signed(&keypair);
        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, back);
        assert!(back.verify(&keypair.public_key));
    }
}
