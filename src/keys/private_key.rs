//! Private and public keys.
//!
//! # Security
//! - Private keys are never logged, displayed or serialized
//! - `Debug` on a private key prints only the public half

use alloy::primitives::{keccak256, Address, Signature as EcdsaSignature};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use ed25519_dalek::{Signature as Ed25519Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ledger::error::{LedgerError, LedgerResult};

/// DER prefix of a PKCS#8 Ed25519 private key.
const ED25519_PRIVATE_DER_PREFIX: &str = "302e020100300506032b657004220420";
/// DER prefix of a PKCS#8-style secp256k1 private key.
const ECDSA_PRIVATE_DER_PREFIX: &str = "3030020100300706052b8104000a04220420";
/// DER prefix of an SPKI Ed25519 public key.
const ED25519_PUBLIC_DER_PREFIX: &str = "302a300506032b6570032100";

/// Signature algorithm of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    Ed25519,
    Ecdsa,
}

impl FromStr for KeyAlgorithm {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ed25519" => Ok(KeyAlgorithm::Ed25519),
            "ecdsa" | "secp256k1" | "ecdsa_secp256k1" => Ok(KeyAlgorithm::Ecdsa),
            other => Err(LedgerError::Key(format!("unknown key algorithm '{}'", other))),
        }
    }
}

/// A public key, used to identify signers and verify signatures.
///
/// Secp256k1 keys are identified by their 20-byte EVM address, which is
/// what signature recovery yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PublicKey {
    Ed25519([u8; 32]),
    Ecdsa(Address),
}

impl PublicKey {
    pub fn algorithm(&self) -> KeyAlgorithm {
        match self {
            PublicKey::Ed25519(_) => KeyAlgorithm::Ed25519,
            PublicKey::Ecdsa(_) => KeyAlgorithm::Ecdsa,
        }
    }

    /// Verify `signature` over `message`. Returns false on any malformed input.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            PublicKey::Ed25519(bytes) => {
                let Ok(key) = VerifyingKey::from_bytes(bytes) else {
                    return false;
                };
                let Ok(sig) = Ed25519Signature::from_slice(signature) else {
                    return false;
                };
                key.verify(message, &sig).is_ok()
            }
            PublicKey::Ecdsa(address) => {
                let Ok(sig) = EcdsaSignature::from_raw(signature) else {
                    return false;
                };
                sig.recover_address_from_prehash(&keccak256(message))
                    .map(|recovered| recovered == *address)
                    .unwrap_or(false)
            }
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicKey::Ed25519(bytes) => {
                write!(f, "{}{}", ED25519_PUBLIC_DER_PREFIX, hex::encode(bytes))
            }
            PublicKey::Ecdsa(address) => write!(f, "{}", address),
        }
    }
}

impl FromStr for PublicKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 42 && s.starts_with("0x") {
            let address: Address = s
                .parse()
                .map_err(|e| LedgerError::Key(format!("invalid ECDSA address: {}", e)))?;
            return Ok(PublicKey::Ecdsa(address));
        }
        let raw = s.strip_prefix(ED25519_PUBLIC_DER_PREFIX).unwrap_or(s);
        let bytes = decode_32(raw)?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|e| LedgerError::Key(format!("invalid Ed25519 public key: {}", e)))?;
        Ok(PublicKey::Ed25519(bytes))
    }
}

impl TryFrom<String> for PublicKey {
    type Error = LedgerError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> String {
        key.to_string()
    }
}

#[derive(Clone)]
enum Inner {
    Ed25519(SigningKey),
    Ecdsa(PrivateKeySigner),
}

/// A private key able to sign transaction bodies.
#[derive(Clone)]
pub struct PrivateKey {
    inner: Inner,
}

impl PrivateKey {
    /// Generate a fresh Ed25519 key.
    pub fn generate_ed25519() -> Self {
        Self {
            inner: Inner::Ed25519(SigningKey::generate(&mut OsRng)),
        }
    }

    /// Generate a fresh secp256k1 key.
    pub fn generate_ecdsa() -> Self {
        Self {
            inner: Inner::Ecdsa(PrivateKeySigner::random()),
        }
    }

    /// Parse an Ed25519 key from raw or DER-encoded hex.
    pub fn from_str_ed25519(s: &str) -> LedgerResult<Self> {
        let raw = strip_hex_prefix(s);
        let raw = raw.strip_prefix(ED25519_PRIVATE_DER_PREFIX).unwrap_or(raw);
        let seed = decode_32(raw)?;
        Ok(Self {
            inner: Inner::Ed25519(SigningKey::from_bytes(&seed)),
        })
    }

    /// Parse a secp256k1 key from raw or DER-encoded hex.
    pub fn from_str_ecdsa(s: &str) -> LedgerResult<Self> {
        let raw = strip_hex_prefix(s);
        let raw = raw.strip_prefix(ECDSA_PRIVATE_DER_PREFIX).unwrap_or(raw);
        let signer: PrivateKeySigner = raw
            .parse()
            .map_err(|e| LedgerError::Key(format!("invalid ECDSA private key: {}", e)))?;
        Ok(Self {
            inner: Inner::Ecdsa(signer),
        })
    }

    /// Parse a key, taking the algorithm from its DER prefix and falling back
    /// to `default` for raw hex.
    pub fn from_str_with_default(s: &str, default: KeyAlgorithm) -> LedgerResult<Self> {
        let raw = strip_hex_prefix(s);
        if raw.starts_with(ED25519_PRIVATE_DER_PREFIX) {
            Self::from_str_ed25519(raw)
        } else if raw.starts_with(ECDSA_PRIVATE_DER_PREFIX) {
            Self::from_str_ecdsa(raw)
        } else {
            match default {
                KeyAlgorithm::Ed25519 => Self::from_str_ed25519(raw),
                KeyAlgorithm::Ecdsa => Self::from_str_ecdsa(raw),
            }
        }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        match &self.inner {
            Inner::Ed25519(_) => KeyAlgorithm::Ed25519,
            Inner::Ecdsa(_) => KeyAlgorithm::Ecdsa,
        }
    }

    /// The public half, always derivable from the private key.
    pub fn public_key(&self) -> PublicKey {
        match &self.inner {
            Inner::Ed25519(key) => PublicKey::Ed25519(key.verifying_key().to_bytes()),
            Inner::Ecdsa(signer) => PublicKey::Ecdsa(signer.address()),
        }
    }

    /// Sign `message`. Secp256k1 signatures cover the keccak256 digest.
    pub fn sign(&self, message: &[u8]) -> LedgerResult<Vec<u8>> {
        match &self.inner {
            Inner::Ed25519(key) => Ok(key.sign(message).to_bytes().to_vec()),
            Inner::Ecdsa(signer) => signer
                .sign_hash_sync(&keccak256(message))
                .map(|sig| sig.as_bytes().to_vec())
                .map_err(|e| LedgerError::Key(format!("signing failed: {}", e))),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("public_key", &self.public_key().to_string())
            .finish_non_exhaustive()
    }
}

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x").unwrap_or(s)
}

fn decode_32(raw: &str) -> LedgerResult<[u8; 32]> {
    let bytes = hex::decode(raw).map_err(|e| LedgerError::Key(format!("invalid key hex: {}", e)))?;
    bytes
        .try_into()
        .map_err(|_| LedgerError::Key("key must be 32 bytes".to_string()))
}
