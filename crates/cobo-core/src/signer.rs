//! API-key request signatures.

use ed25519_dalek::{SECRET_KEY_LENGTH, Signer as _, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::DispatchError;

/// Produces a signature over an arbitrary message.
pub trait Signer {
    fn sign(&self, message: &[u8]) -> Vec<u8>;
}

/// Ed25519 over `SHA256(SHA256(message))`, the scheme the API verifies.
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// Build from the hex-encoded 32-byte secret stored as `api_secret`.
    pub fn from_hex(secret: &str) -> Result<Self, DispatchError> {
        let bytes = hex::decode(secret.trim())
            .map_err(|e| DispatchError::Signing(format!("api_secret is not valid hex: {e}")))?;
        let seed: [u8; SECRET_KEY_LENGTH] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            DispatchError::Signing(format!(
                "api_secret must be {SECRET_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self {
            key: SigningKey::from_bytes(&seed),
        })
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl Signer for Ed25519Signer {
    fn sign(&self, message: &[u8]) -> Vec<u8> {
        let digest = Sha256::digest(Sha256::digest(message));
        self.key.sign(&digest).to_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};

    const SECRET: &str = "9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";

    #[test]
    fn signature_verifies_over_double_digest() {
        let signer = Ed25519Signer::from_hex(SECRET).unwrap();
        let message = b"GET|/v2/wallets|1700000000000||";
        let bytes = signer.sign(message);
        assert_eq!(bytes.len(), 64);

        let signature = Signature::from_slice(&bytes).unwrap();
        let digest = Sha256::digest(Sha256::digest(message));
        assert!(signer.verifying_key().verify(&digest, &signature).is_ok());
        assert!(signer.verifying_key().verify(message, &signature).is_err());
    }

    #[test]
    fn rejects_bad_secrets() {
        assert!(matches!(
            Ed25519Signer::from_hex("not hex"),
            Err(DispatchError::Signing(_))
        ));
        let err = Ed25519Signer::from_hex("abcd").err().unwrap();
        assert!(err.to_string().contains("got 2"), "{err}");
    }
}
