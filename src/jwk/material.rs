// ABOUTME: Typed signing and verifying key unions constructed from JWK values
// ABOUTME: One sign/verify interface over the Ed25519, HMAC, ECDSA, RSA and RSA-PSS families
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Typed key material.
//!
//! [`SigningKey`] and [`VerifyingKey`] are tagged unions over the supported
//! algorithm families, each exposing a single byte-level operation. Producers
//! and recipients dispatch once on the usage's configured algorithm and never
//! look at key internals again.
//!
//! Signature encodings follow JWS: raw 64-byte Ed25519, raw HMAC tag,
//! fixed-width `r ∥ s` for ECDSA, and PKCS#1 v1.5 / PSS octet strings sized
//! to the RSA modulus.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};

use super::{Algorithm, Jwk};
use crate::errors::{Error, Result};

/// Private key material bound to an algorithm, ready to sign.
pub enum SigningKey {
    /// Ed25519 private key.
    Ed25519(ed25519_dalek::SigningKey),
    /// HMAC shared secret with its hash selector.
    Hmac {
        /// HS256, HS384 or HS512.
        alg: Algorithm,
        /// Raw shared secret.
        key: Vec<u8>,
    },
    /// ECDSA P-256 private key.
    EcdsaP256(p256::ecdsa::SigningKey),
    /// ECDSA P-384 private key.
    EcdsaP384(p384::ecdsa::SigningKey),
    /// ECDSA P-521 private key.
    EcdsaP521(p521::ecdsa::SigningKey),
    /// RSA private key with its padding/hash selector (RS* or PS*).
    Rsa {
        /// RS256..RS512 or PS256..PS512.
        alg: Algorithm,
        /// RSA private key.
        key: rsa::RsaPrivateKey,
    },
}

/// Public (or shared-secret) key material bound to an algorithm, ready to
/// verify.
pub enum VerifyingKey {
    /// Ed25519 public key.
    Ed25519(ed25519_dalek::VerifyingKey),
    /// HMAC shared secret with its hash selector.
    Hmac {
        /// HS256, HS384 or HS512.
        alg: Algorithm,
        /// Raw shared secret.
        key: Vec<u8>,
    },
    /// ECDSA P-256 public key.
    EcdsaP256(p256::ecdsa::VerifyingKey),
    /// ECDSA P-384 public key.
    EcdsaP384(p384::ecdsa::VerifyingKey),
    /// ECDSA P-521 public key.
    EcdsaP521(p521::ecdsa::VerifyingKey),
    /// RSA public key with its padding/hash selector (RS* or PS*).
    Rsa {
        /// RS256..RS512 or PS256..PS512.
        alg: Algorithm,
        /// RSA public key.
        key: rsa::RsaPublicKey,
    },
}

impl SigningKey {
    /// Build signing material from a private JWK for the given algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] when required members are absent or of
    /// the wrong size for the algorithm.
    pub fn from_jwk(alg: Algorithm, jwk: &Jwk) -> Result<Self> {
        match alg {
            Algorithm::EdDSA => {
                let seed = array_32(&jwk.member("d")?, "d")?;
                Ok(Self::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed)))
            }
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(Self::Hmac {
                alg,
                key: jwk.member("k")?,
            }),
            Algorithm::ES256 => {
                let d = fixed_width(jwk.member("d")?, 32, "d")?;
                let secret = p256::SecretKey::from_slice(&d)
                    .map_err(|_| Error::invalid_key("invalid P-256 private scalar"))?;
                Ok(Self::EcdsaP256(p256::ecdsa::SigningKey::from(secret)))
            }
            Algorithm::ES384 => {
                let d = fixed_width(jwk.member("d")?, 48, "d")?;
                let secret = p384::SecretKey::from_slice(&d)
                    .map_err(|_| Error::invalid_key("invalid P-384 private scalar"))?;
                Ok(Self::EcdsaP384(p384::ecdsa::SigningKey::from(secret)))
            }
            Algorithm::ES512 => {
                let d = fixed_width(jwk.member("d")?, 66, "d")?;
                let signing_key = p521::ecdsa::SigningKey::from_slice(&d)
                    .map_err(|_| Error::invalid_key("invalid P-521 private scalar"))?;
                Ok(Self::EcdsaP521(signing_key))
            }
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => {
                let n = rsa::BigUint::from_bytes_be(&jwk.member("n")?);
                let e = rsa::BigUint::from_bytes_be(&jwk.member("e")?);
                let d = rsa::BigUint::from_bytes_be(&jwk.member("d")?);
                let p = rsa::BigUint::from_bytes_be(&jwk.member("p")?);
                let q = rsa::BigUint::from_bytes_be(&jwk.member("q")?);

                let key = rsa::RsaPrivateKey::from_components(n, e, d, vec![p, q])
                    .map_err(|err| Error::InvalidKey(format!("invalid RSA components: {err}")))?;

                Ok(Self::Rsa { alg, key })
            }
        }
    }

    /// Sign a message, returning the JWS signature bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying primitive fails.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Ed25519(key) => {
                let sig: ed25519_dalek::Signature = key
                    .try_sign(message)
                    .map_err(|err| Error::internal(format!("ed25519 signing: {err}")))?;
                Ok(sig.to_bytes().to_vec())
            }
            Self::Hmac { alg, key } => hmac_tag(*alg, key, message),
            Self::EcdsaP256(key) => {
                let sig: p256::ecdsa::Signature = key
                    .try_sign(message)
                    .map_err(|err| Error::internal(format!("P-256 signing: {err}")))?;
                Ok(sig.to_bytes().to_vec())
            }
            Self::EcdsaP384(key) => {
                let sig: p384::ecdsa::Signature = key
                    .try_sign(message)
                    .map_err(|err| Error::internal(format!("P-384 signing: {err}")))?;
                Ok(sig.to_bytes().to_vec())
            }
            Self::EcdsaP521(key) => {
                let sig: p521::ecdsa::Signature = key
                    .try_sign(message)
                    .map_err(|err| Error::internal(format!("P-521 signing: {err}")))?;
                Ok(sig.to_bytes().to_vec())
            }
            Self::Rsa { alg, key } => rsa_sign(*alg, key, message),
        }
    }
}

impl VerifyingKey {
    /// Build verifying material from a JWK for the given algorithm.
    ///
    /// Accepts both public JWKs and private JWKs (which carry the public
    /// members as well); HMAC keys verify with the shared secret itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] when required members are absent or of
    /// the wrong size for the algorithm.
    pub fn from_jwk(alg: Algorithm, jwk: &Jwk) -> Result<Self> {
        match alg {
            Algorithm::EdDSA => {
                let x = array_32(&jwk.member("x")?, "x")?;
                let key = ed25519_dalek::VerifyingKey::from_bytes(&x)
                    .map_err(|_| Error::invalid_key("invalid Ed25519 public key"))?;
                Ok(Self::Ed25519(key))
            }
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(Self::Hmac {
                alg,
                key: jwk.member("k")?,
            }),
            Algorithm::ES256 => {
                let sec1 = sec1_point(jwk, 32)?;
                let key = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| Error::invalid_key("invalid P-256 public key"))?;
                Ok(Self::EcdsaP256(key))
            }
            Algorithm::ES384 => {
                let sec1 = sec1_point(jwk, 48)?;
                let key = p384::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| Error::invalid_key("invalid P-384 public key"))?;
                Ok(Self::EcdsaP384(key))
            }
            Algorithm::ES512 => {
                let sec1 = sec1_point(jwk, 66)?;
                let key = p521::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|_| Error::invalid_key("invalid P-521 public key"))?;
                Ok(Self::EcdsaP521(key))
            }
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => {
                let n = rsa::BigUint::from_bytes_be(&jwk.member("n")?);
                let e = rsa::BigUint::from_bytes_be(&jwk.member("e")?);
                let key = rsa::RsaPublicKey::new(n, e)
                    .map_err(|err| Error::InvalidKey(format!("invalid RSA public key: {err}")))?;
                Ok(Self::Rsa { alg, key })
            }
        }
    }

    /// Verify a JWS signature over a message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] when the signature is malformed or
    /// does not authenticate the message.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            Self::Ed25519(key) => {
                let sig = ed25519_dalek::Signature::try_from(signature)
                    .map_err(|_| Error::InvalidSignature)?;
                key.verify(message, &sig).map_err(|_| Error::InvalidSignature)
            }
            Self::Hmac { alg, key } => hmac_verify(*alg, key, message, signature),
            Self::EcdsaP256(key) => {
                let sig = p256::ecdsa::Signature::from_slice(signature)
                    .map_err(|_| Error::InvalidSignature)?;
                key.verify(message, &sig).map_err(|_| Error::InvalidSignature)
            }
            Self::EcdsaP384(key) => {
                let sig = p384::ecdsa::Signature::from_slice(signature)
                    .map_err(|_| Error::InvalidSignature)?;
                key.verify(message, &sig).map_err(|_| Error::InvalidSignature)
            }
            Self::EcdsaP521(key) => {
                let sig = p521::ecdsa::Signature::from_slice(signature)
                    .map_err(|_| Error::InvalidSignature)?;
                key.verify(message, &sig).map_err(|_| Error::InvalidSignature)
            }
            Self::Rsa { alg, key } => rsa_verify(*alg, key, message, signature),
        }
    }
}

fn hmac_tag(alg: Algorithm, key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    match alg {
        Algorithm::HS256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key)
                .map_err(|_| Error::invalid_key("invalid HS256 secret"))?;
            mac.update(message);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        Algorithm::HS384 => {
            let mut mac = Hmac::<Sha384>::new_from_slice(key)
                .map_err(|_| Error::invalid_key("invalid HS384 secret"))?;
            mac.update(message);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        Algorithm::HS512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key)
                .map_err(|_| Error::invalid_key("invalid HS512 secret"))?;
            mac.update(message);
            Ok(mac.finalize().into_bytes().to_vec())
        }
        _ => Err(Error::invalid_key(format!("{alg} is not an HMAC algorithm"))),
    }
}

fn hmac_verify(alg: Algorithm, key: &[u8], message: &[u8], signature: &[u8]) -> Result<()> {
    // Constant-time comparison via the Mac trait.
    match alg {
        Algorithm::HS256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key)
                .map_err(|_| Error::invalid_key("invalid HS256 secret"))?;
            mac.update(message);
            mac.verify_slice(signature).map_err(|_| Error::InvalidSignature)
        }
        Algorithm::HS384 => {
            let mut mac = Hmac::<Sha384>::new_from_slice(key)
                .map_err(|_| Error::invalid_key("invalid HS384 secret"))?;
            mac.update(message);
            mac.verify_slice(signature).map_err(|_| Error::InvalidSignature)
        }
        Algorithm::HS512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key)
                .map_err(|_| Error::invalid_key("invalid HS512 secret"))?;
            mac.update(message);
            mac.verify_slice(signature).map_err(|_| Error::InvalidSignature)
        }
        _ => Err(Error::invalid_key(format!("{alg} is not an HMAC algorithm"))),
    }
}

fn rsa_sign(alg: Algorithm, key: &rsa::RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>> {
    let mut rng = rand::rngs::OsRng;

    let signature = match alg {
        Algorithm::RS256 => rsa::pkcs1v15::SigningKey::<Sha256>::new(key.clone())
            .try_sign(message)
            .map(|sig| sig.to_vec()),
        Algorithm::RS384 => rsa::pkcs1v15::SigningKey::<Sha384>::new(key.clone())
            .try_sign(message)
            .map(|sig| sig.to_vec()),
        Algorithm::RS512 => rsa::pkcs1v15::SigningKey::<Sha512>::new(key.clone())
            .try_sign(message)
            .map(|sig| sig.to_vec()),
        Algorithm::PS256 => rsa::pss::BlindedSigningKey::<Sha256>::new(key.clone())
            .try_sign_with_rng(&mut rng, message)
            .map(|sig| sig.to_vec()),
        Algorithm::PS384 => rsa::pss::BlindedSigningKey::<Sha384>::new(key.clone())
            .try_sign_with_rng(&mut rng, message)
            .map(|sig| sig.to_vec()),
        Algorithm::PS512 => rsa::pss::BlindedSigningKey::<Sha512>::new(key.clone())
            .try_sign_with_rng(&mut rng, message)
            .map(|sig| sig.to_vec()),
        _ => return Err(Error::invalid_key(format!("{alg} is not an RSA algorithm"))),
    };

    signature.map_err(|err| Error::internal(format!("RSA signing: {err}")))
}

fn rsa_verify(
    alg: Algorithm,
    key: &rsa::RsaPublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<()> {
    let outcome = match alg {
        Algorithm::RS256 => rsa::pkcs1v15::Signature::try_from(signature)
            .and_then(|sig| {
                rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key.clone()).verify(message, &sig)
            }),
        Algorithm::RS384 => rsa::pkcs1v15::Signature::try_from(signature)
            .and_then(|sig| {
                rsa::pkcs1v15::VerifyingKey::<Sha384>::new(key.clone()).verify(message, &sig)
            }),
        Algorithm::RS512 => rsa::pkcs1v15::Signature::try_from(signature)
            .and_then(|sig| {
                rsa::pkcs1v15::VerifyingKey::<Sha512>::new(key.clone()).verify(message, &sig)
            }),
        Algorithm::PS256 => rsa::pss::Signature::try_from(signature).and_then(|sig| {
            rsa::pss::VerifyingKey::<Sha256>::new(key.clone()).verify(message, &sig)
        }),
        Algorithm::PS384 => rsa::pss::Signature::try_from(signature).and_then(|sig| {
            rsa::pss::VerifyingKey::<Sha384>::new(key.clone()).verify(message, &sig)
        }),
        Algorithm::PS512 => rsa::pss::Signature::try_from(signature).and_then(|sig| {
            rsa::pss::VerifyingKey::<Sha512>::new(key.clone()).verify(message, &sig)
        }),
        _ => return Err(Error::invalid_key(format!("{alg} is not an RSA algorithm"))),
    };

    outcome.map_err(|_| Error::InvalidSignature)
}

/// Uncompressed SEC1 point (`0x04 ∥ x ∥ y`) from EC JWK members.
fn sec1_point(jwk: &Jwk, width: usize) -> Result<Vec<u8>> {
    let x = fixed_width(jwk.member("x")?, width, "x")?;
    let y = fixed_width(jwk.member("y")?, width, "y")?;

    let mut point = Vec::with_capacity(1 + 2 * width);
    point.push(0x04);
    point.extend_from_slice(&x);
    point.extend_from_slice(&y);

    Ok(point)
}

/// Left-pad a big-endian integer to the curve's field width.
fn fixed_width(bytes: Vec<u8>, width: usize, name: &'static str) -> Result<Vec<u8>> {
    match bytes.len() {
        len if len == width => Ok(bytes),
        len if len < width => {
            let mut padded = vec![0u8; width - len];
            padded.extend_from_slice(&bytes);
            Ok(padded)
        }
        len => Err(Error::InvalidKey(format!(
            "{name} member is {len} bytes, expected at most {width}"
        ))),
    }
}

fn array_32(bytes: &[u8], name: &'static str) -> Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| Error::InvalidKey(format!("{name} member must be exactly 32 bytes")))
}
