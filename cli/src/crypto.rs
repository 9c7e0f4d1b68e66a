//! SM2 decryption of NFT report payloads.
//!
//! The on-chain ciphertext is hex in C1C3C2 order with the `04` point prefix
//! stripped; it is restored before decrypting. Decryption follows
//! GM/T 0003.4 over the `sm2` curve arithmetic and `sm3`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use carbonsync_core::{PayloadDecryptor, SyncError};

#[cfg(feature = "sm2")]
pub use enabled::Sm2Decryptor;

#[cfg(feature = "sm2")]
mod enabled {
    use anyhow::{Context, Result};
    use carbonsync_core::{PayloadDecryptor, SyncError};
    use sm2::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
    use sm2::{AffinePoint, EncodedPoint, NonZeroScalar, ProjectivePoint, SecretKey};
    use sm3::{Digest, Sm3};

    /// Uncompressed `04 || x || y`.
    const POINT_LEN: usize = 65;
    const DIGEST_LEN: usize = 32;

    pub struct Sm2Decryptor {
        secret: NonZeroScalar,
    }

    impl Sm2Decryptor {
        /// Build from the hex-encoded 32-byte private scalar.
        pub fn from_hex(private_key: &str) -> Result<Self> {
            let bytes = hex::decode(private_key.trim().trim_start_matches("0x"))
                .context("SM2 private key is not valid hex")?;
            let secret = SecretKey::from_slice(&bytes)
                .map_err(|e| anyhow::anyhow!("SM2 private key is invalid: {e}"))?;
            Ok(Self {
                secret: secret.to_nonzero_scalar(),
            })
        }

        /// Decrypt a `C1 || C3 || C2` ciphertext.
        pub(super) fn open(&self, sealed: &[u8]) -> Result<Vec<u8>, SyncError> {
            if sealed.len() <= POINT_LEN + DIGEST_LEN {
                return Err(SyncError::Payload(format!("ciphertext too short ({} bytes)", sealed.len())));
            }
            let (c1, rest) = sealed.split_at(POINT_LEN);
            let (c3, c2) = rest.split_at(DIGEST_LEN);

            let c1 = EncodedPoint::from_bytes(c1)
                .map_err(|e| SyncError::Payload(format!("bad C1 encoding: {e}")))?;
            let c1: AffinePoint = Option::from(AffinePoint::from_encoded_point(&c1))
                .ok_or_else(|| SyncError::Payload("C1 is not on the curve".into()))?;

            let shared = AffinePoint::from(ProjectivePoint::from(c1) * *self.secret).to_encoded_point(false);
            let (Some(x2), Some(y2)) = (shared.x(), shared.y()) else {
                return Err(SyncError::Payload("shared point is the identity".into()));
            };

            let mut plain = kdf(x2, y2, c2.len());
            if plain.iter().all(|b| *b == 0) {
                return Err(SyncError::Payload("derived key is all zero".into()));
            }
            plain.iter_mut().zip(c2).for_each(|(k, c)| *k ^= c);

            let digest = Sm3::new().chain_update(x2).chain_update(&plain).chain_update(y2).finalize();
            if digest.as_slice() != c3 {
                return Err(SyncError::Payload("C3 digest mismatch".into()));
            }
            Ok(plain)
        }
    }

    /// The SM2 key derivation function over SM3.
    pub(super) fn kdf(x2: &[u8], y2: &[u8], len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len + DIGEST_LEN);
        let mut counter: u32 = 1;
        while out.len() < len {
            let block = Sm3::new()
                .chain_update(x2)
                .chain_update(y2)
                .chain_update(counter.to_be_bytes())
                .finalize();
            out.extend_from_slice(&block);
            counter += 1;
        }
        out.truncate(len);
        out
    }

    impl PayloadDecryptor for Sm2Decryptor {
        fn decrypt(&self, ciphertext: &str) -> Result<String, SyncError> {
            let body = hex::decode(ciphertext.trim())
                .map_err(|e| SyncError::Payload(format!("ciphertext is not hex: {e}")))?;
            let mut sealed = Vec::with_capacity(body.len() + 1);
            sealed.push(0x04);
            sealed.extend_from_slice(&body);

            let plain = self.open(&sealed)?;
            String::from_utf8(plain)
                .map_err(|e| SyncError::Payload(format!("plaintext is not UTF-8: {e}")))
        }
    }
}

/// Stands in when the binary is built without the `sm2` feature.
///
/// Every payload fails to decrypt, so mints are still recorded but never
/// linked to a report.
pub struct UnavailableDecryptor;

impl PayloadDecryptor for UnavailableDecryptor {
    fn decrypt(&self, _ciphertext: &str) -> Result<String, SyncError> {
        Err(SyncError::Payload("built without SM2 support".into()))
    }
}

/// Load the payload decryptor for the key stored at `path`.
#[cfg(feature = "sm2")]
pub fn load_decryptor(path: &Path) -> Result<Arc<dyn PayloadDecryptor>> {
    use anyhow::Context;

    let key = std::fs::read_to_string(path)
        .with_context(|| format!("reading SM2 private key from {}", path.display()))?;
    Ok(Arc::new(Sm2Decryptor::from_hex(&key)?))
}

/// Load the payload decryptor for the key stored at `path`.
#[cfg(not(feature = "sm2"))]
pub fn load_decryptor(path: &Path) -> Result<Arc<dyn PayloadDecryptor>> {
    tracing::warn!(
        key = %path.display(),
        "built without the sm2 feature; report payloads will not be decrypted"
    );
    Ok(Arc::new(UnavailableDecryptor))
}
