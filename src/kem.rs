//! Hybrid KEM: ML-KEM-768 + X25519
//!
//! Security holds if *either* primitive remains secure.
//!
//! Key serialization:
//!   PublicKey  = mlkem_ek[1184] || x25519_pk[32]   (1216 bytes)
//!   SecretKey  = mlkem_dk[2400] || x25519_sk[32]   (2432 bytes)
//!
//! Encapsulated key (stanza argument):
//!   mlkem_ct[1088] || x25519_ephemeral_pk[32]      (1120 bytes)
//!
//! Shared secret:
//!   SHA3-256(mlkem_ss || x25519_ss || x25519_ephemeral_pk || x25519_pk || "\.//^\")

use ml_kem::{
    kem::{Decapsulate, Encapsulate},
    Ciphertext, EncodedSizeUser, KemCore, MlKem768, MlKem768Params,
};
use rand_core::OsRng;
use sha3::{Digest, Sha3_256};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};

use crate::error::{ConfigError, Error, FormatError, Result};
use crate::wire::{
    KEM_CIPHERTEXT_BYTES, KEM_PUBLIC_KEY_BYTES, KEM_SECRET_KEY_BYTES, MLKEM_CIPHERTEXT_BYTES,
    MLKEM_PUBLIC_KEY_BYTES, MLKEM_SECRET_KEY_BYTES, SHARED_SECRET_BYTES, X25519_KEY_BYTES,
};

type Ek = ml_kem::kem::EncapsulationKey<MlKem768Params>;
type Dk = ml_kem::kem::DecapsulationKey<MlKem768Params>;

/// ML-KEM typed ciphertext (for TryFrom).
type MlKemCt = Ciphertext<MlKem768>;

/// Domain separator for the combiner.
const COMBINER_LABEL: &[u8; 6] = b"\\.//^\\";

/// Offset of the encapsulation key inside an encoded ML-KEM-768
/// decapsulation key (dk_pke[1152] || ek[1184] || H(ek) || z).
const DK_EK_OFFSET: usize = 1152;

// ---------------------------------------------------------------------------
// Public key (hybrid)
// ---------------------------------------------------------------------------

/// Hybrid public key: ML-KEM-768 encapsulation key + X25519 public key.
#[derive(Clone)]
pub struct PublicKey {
    mlkem: Ek,
    x25519: X25519PublicKey,
}

impl PublicKey {
    /// Serialize: mlkem_ek[1184] || x25519_pk[32]
    pub fn to_bytes(&self) -> [u8; KEM_PUBLIC_KEY_BYTES] {
        let mut out = [0u8; KEM_PUBLIC_KEY_BYTES];
        out[..MLKEM_PUBLIC_KEY_BYTES].copy_from_slice(self.mlkem.as_bytes().as_slice());
        out[MLKEM_PUBLIC_KEY_BYTES..].copy_from_slice(self.x25519.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEM_PUBLIC_KEY_BYTES {
            return Err(ConfigError::InvalidRecipient.into());
        }

        let mlkem_bytes: [u8; MLKEM_PUBLIC_KEY_BYTES] = bytes[..MLKEM_PUBLIC_KEY_BYTES]
            .try_into()
            .map_err(|_| ConfigError::InvalidRecipient)?;
        let mlkem = Ek::from_bytes(&mlkem_bytes.into());

        let x25519_bytes: [u8; X25519_KEY_BYTES] = bytes[MLKEM_PUBLIC_KEY_BYTES..]
            .try_into()
            .map_err(|_| ConfigError::InvalidRecipient)?;
        let x25519 = X25519PublicKey::from(x25519_bytes);

        Ok(Self { mlkem, x25519 })
    }
}

// ---------------------------------------------------------------------------
// Secret key (hybrid)
// ---------------------------------------------------------------------------

/// Hybrid secret key: ML-KEM-768 decapsulation key + X25519 static secret.
pub struct SecretKey {
    mlkem: Dk,
    x25519: StaticSecret,
}

impl SecretKey {
    /// Serialize: mlkem_dk[2400] || x25519_sk[32]
    pub fn to_bytes(&self) -> [u8; KEM_SECRET_KEY_BYTES] {
        let mut out = [0u8; KEM_SECRET_KEY_BYTES];
        out[..MLKEM_SECRET_KEY_BYTES].copy_from_slice(self.mlkem.as_bytes().as_slice());
        out[MLKEM_SECRET_KEY_BYTES..].copy_from_slice(&self.x25519.to_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEM_SECRET_KEY_BYTES {
            return Err(ConfigError::InvalidIdentity.into());
        }

        let mlkem_bytes: [u8; MLKEM_SECRET_KEY_BYTES] = bytes[..MLKEM_SECRET_KEY_BYTES]
            .try_into()
            .map_err(|_| ConfigError::InvalidIdentity)?;
        let mlkem = Dk::from_bytes(&mlkem_bytes.into());

        let x25519_bytes: [u8; X25519_KEY_BYTES] = bytes[MLKEM_SECRET_KEY_BYTES..]
            .try_into()
            .map_err(|_| ConfigError::InvalidIdentity)?;
        let x25519 = StaticSecret::from(x25519_bytes);

        Ok(Self { mlkem, x25519 })
    }

    /// The matching public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        let dk = self.mlkem.as_bytes();
        let ek_bytes: [u8; MLKEM_PUBLIC_KEY_BYTES] = dk.as_slice()
            [DK_EK_OFFSET..DK_EK_OFFSET + MLKEM_PUBLIC_KEY_BYTES]
            .try_into()
            .map_err(|_| ConfigError::InvalidIdentity)?;
        Ok(PublicKey {
            mlkem: Ek::from_bytes(&ek_bytes.into()),
            x25519: X25519PublicKey::from(&self.x25519),
        })
    }
}

// ---------------------------------------------------------------------------
// KEM provider trait + hybrid implementation
// ---------------------------------------------------------------------------

pub trait KemProvider {
    fn keygen() -> (PublicKey, SecretKey);
    /// Returns (shared_secret, encapsulated_key).
    fn encapsulate(
        pk: &PublicKey,
    ) -> Result<([u8; SHARED_SECRET_BYTES], [u8; KEM_CIPHERTEXT_BYTES])>;
    /// Returns the shared secret. A malformed `enc` is a format error; an
    /// ML-KEM failure is `Error::Decryption`.
    fn decapsulate(sk: &SecretKey, enc: &[u8]) -> Result<[u8; SHARED_SECRET_BYTES]>;
}

/// ML-KEM-768 + X25519 provider.
pub struct HybridX25519MlKem768;

impl KemProvider for HybridX25519MlKem768 {
    fn keygen() -> (PublicKey, SecretKey) {
        // ML-KEM-768 keypair (generate returns (dk, ek))
        let (mlkem_dk, mlkem_ek) = MlKem768::generate(&mut OsRng);

        // X25519 long-term keypair
        let x25519_sk = StaticSecret::random_from_rng(OsRng);
        let x25519_pk = X25519PublicKey::from(&x25519_sk);

        (
            PublicKey {
                mlkem: mlkem_ek,
                x25519: x25519_pk,
            },
            SecretKey {
                mlkem: mlkem_dk,
                x25519: x25519_sk,
            },
        )
    }

    fn encapsulate(
        pk: &PublicKey,
    ) -> Result<([u8; SHARED_SECRET_BYTES], [u8; KEM_CIPHERTEXT_BYTES])> {
        let (mlkem_ct, mlkem_ss) = pk
            .mlkem
            .encapsulate(&mut OsRng)
            .map_err(|_| Error::Encryption)?;

        let x25519_eph = EphemeralSecret::random_from_rng(OsRng);
        let x25519_eph_pk = X25519PublicKey::from(&x25519_eph);
        let x25519_ss = x25519_eph.diffie_hellman(&pk.x25519);

        let ss = combine(
            mlkem_ss.as_slice(),
            x25519_ss.as_bytes(),
            x25519_eph_pk.as_bytes(),
            pk.x25519.as_bytes(),
        );

        // mlkem_ct[1088] || x25519_ephemeral_pk[32]
        let mut enc = [0u8; KEM_CIPHERTEXT_BYTES];
        enc[..MLKEM_CIPHERTEXT_BYTES].copy_from_slice(mlkem_ct.as_slice());
        enc[MLKEM_CIPHERTEXT_BYTES..].copy_from_slice(x25519_eph_pk.as_bytes());

        Ok((ss, enc))
    }

    fn decapsulate(sk: &SecretKey, enc: &[u8]) -> Result<[u8; SHARED_SECRET_BYTES]> {
        if enc.len() != KEM_CIPHERTEXT_BYTES {
            return Err(FormatError::InvalidStanza.into());
        }

        let mlkem_ct =
            MlKemCt::try_from(&enc[..MLKEM_CIPHERTEXT_BYTES]).map_err(|_| FormatError::InvalidStanza)?;
        let x25519_epk_bytes: [u8; X25519_KEY_BYTES] = enc[MLKEM_CIPHERTEXT_BYTES..]
            .try_into()
            .map_err(|_| FormatError::InvalidStanza)?;
        let x25519_epk = X25519PublicKey::from(x25519_epk_bytes);

        let mlkem_ss = sk
            .mlkem
            .decapsulate(&mlkem_ct)
            .map_err(|_| Error::Decryption)?;
        let x25519_ss = sk.x25519.diffie_hellman(&x25519_epk);
        let x25519_pk = X25519PublicKey::from(&sk.x25519);

        Ok(combine(
            mlkem_ss.as_slice(),
            x25519_ss.as_bytes(),
            &x25519_epk_bytes,
            x25519_pk.as_bytes(),
        ))
    }
}

fn combine(
    mlkem_ss: &[u8],
    x25519_ss: &[u8],
    x25519_ct: &[u8],
    x25519_pk: &[u8],
) -> [u8; SHARED_SECRET_BYTES] {
    let mut h = Sha3_256::new();
    h.update(mlkem_ss);
    h.update(x25519_ss);
    h.update(x25519_ct);
    h.update(x25519_pk);
    h.update(COMBINER_LABEL);
    let mut out = [0u8; SHARED_SECRET_BYTES];
    out.copy_from_slice(&h.finalize());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encapsulate_decapsulate() {
        let (pk, sk) = HybridX25519MlKem768::keygen();
        let (ss, enc) = HybridX25519MlKem768::encapsulate(&pk).unwrap();
        let ss2 = HybridX25519MlKem768::decapsulate(&sk, &enc).unwrap();
        assert_eq!(ss, ss2);
    }

    #[test]
    fn test_key_serialization() {
        let (pk, sk) = HybridX25519MlKem768::keygen();
        let pk2 = PublicKey::from_bytes(&pk.to_bytes()).unwrap();
        assert_eq!(pk.to_bytes(), pk2.to_bytes());

        let sk2 = SecretKey::from_bytes(&sk.to_bytes()).unwrap();
        assert_eq!(sk2.public_key().unwrap().to_bytes(), pk.to_bytes());
    }

    #[test]
    fn test_wrong_key_differs() {
        let (pk, _) = HybridX25519MlKem768::keygen();
        let (_, other) = HybridX25519MlKem768::keygen();
        let (ss, enc) = HybridX25519MlKem768::encapsulate(&pk).unwrap();
        // ML-KEM decapsulation rejects implicitly: a different secret, not an error.
        let wrong = HybridX25519MlKem768::decapsulate(&other, &enc).unwrap();
        assert_ne!(ss, wrong);
    }

    #[test]
    fn test_bad_lengths() {
        let (_, sk) = HybridX25519MlKem768::keygen();
        assert!(matches!(
            HybridX25519MlKem768::decapsulate(&sk, &[0u8; 100]),
            Err(Error::Format(FormatError::InvalidStanza))
        ));
        assert!(PublicKey::from_bytes(&[0u8; 32]).is_err());
        assert!(SecretKey::from_bytes(&[0u8; 32]).is_err());
    }
}
