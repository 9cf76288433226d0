// ABOUTME: Per-algorithm JWK pair generation for the rotation engine
// ABOUTME: Mints one UUID per rotation, shared by the private and public halves and the row id
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Async-IO.org

//! Algorithm-appropriate key pair generation.
//!
//! Every generator returns the private JWK, the public JWK when the
//! algorithm is asymmetric, and the freshly minted key id. Symmetric (HMAC)
//! keys are sized to the hash output and have no public half. PS* variants
//! share generation with RS*; the padding only differs at sign/verify time.

use ed25519_dalek::SigningKey as Ed25519SigningKey;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{RsaPrivateKey, RsaPublicKey};
use uuid::Uuid;
use zeroize::Zeroize;

use super::{encode_member, Algorithm, Jwk};
use crate::errors::{Error, Result};

/// RSA modulus size in bits. 2048 is the floor for new keys.
const RSA_KEY_SIZE: usize = 2048;

/// Output of a single generation step.
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    /// Private (or symmetric) JWK, including the public members.
    pub private: Jwk,
    /// Public JWK; `None` for symmetric algorithms.
    pub public: Option<Jwk>,
    /// Key id shared by both halves; becomes the database row id.
    pub kid: Uuid,
}

/// Generate a fresh key pair for the given algorithm.
///
/// # Errors
///
/// Returns an error if the underlying key generation fails (RSA prime
/// search, RNG failure).
pub fn generate(alg: Algorithm) -> Result<GeneratedKey> {
    match alg {
        Algorithm::EdDSA => generate_ed25519(),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => generate_hmac(alg),
        Algorithm::ES256 => generate_ec_p256(),
        Algorithm::ES384 => generate_ec_p384(),
        Algorithm::ES512 => generate_ec_p521(),
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => generate_rsa(alg),
    }
}

/// Shared skeleton: kid, use and alg members are identical on both halves.
fn base_jwk(kty: &str, alg: Algorithm, kid: Uuid) -> Jwk {
    Jwk {
        kty: kty.to_owned(),
        alg: Some(alg),
        key_use: Some("sig".to_owned()),
        kid: Some(kid.to_string()),
        ..Jwk::default()
    }
}

fn generate_ed25519() -> Result<GeneratedKey> {
    let kid = Uuid::new_v4();

    let mut seed = [0u8; 32];
    OsRng.fill_bytes(&mut seed);
    let signing = Ed25519SigningKey::from_bytes(&seed);
    seed.zeroize();

    let verifying = signing.verifying_key();

    let mut public = base_jwk("OKP", Algorithm::EdDSA, kid);
    public.crv = Some("Ed25519".to_owned());
    public.x = Some(encode_member(verifying.as_bytes()));

    let mut private = public.clone();
    private.d = Some(encode_member(&signing.to_bytes()));

    Ok(GeneratedKey {
        private,
        public: Some(public),
        kid,
    })
}

fn generate_hmac(alg: Algorithm) -> Result<GeneratedKey> {
    let kid = Uuid::new_v4();

    let len = alg
        .hmac_key_len()
        .ok_or_else(|| Error::invalid_key(format!("{alg} is not an HMAC algorithm")))?;

    let mut secret = vec![0u8; len];
    OsRng.fill_bytes(&mut secret);

    let mut private = base_jwk("oct", alg, kid);
    private.k = Some(encode_member(&secret));
    secret.zeroize();

    Ok(GeneratedKey {
        private,
        public: None,
        kid,
    })
}

fn generate_ec_p256() -> Result<GeneratedKey> {
    let kid = Uuid::new_v4();

    let secret = p256::SecretKey::random(&mut OsRng);
    let point = secret.public_key().to_encoded_point(false);
    let x = point
        .x()
        .ok_or_else(|| Error::invalid_key("P-256 point has no x coordinate"))?;
    let y = point
        .y()
        .ok_or_else(|| Error::invalid_key("P-256 point has no y coordinate"))?;

    let mut public = base_jwk("EC", Algorithm::ES256, kid);
    public.crv = Some("P-256".to_owned());
    public.x = Some(encode_member(x));
    public.y = Some(encode_member(y));

    let mut private = public.clone();
    private.d = Some(encode_member(&secret.to_bytes()));

    Ok(GeneratedKey {
        private,
        public: Some(public),
        kid,
    })
}

fn generate_ec_p384() -> Result<GeneratedKey> {
    let kid = Uuid::new_v4();

    let secret = p384::SecretKey::random(&mut OsRng);
    let point = secret.public_key().to_encoded_point(false);
    let x = point
        .x()
        .ok_or_else(|| Error::invalid_key("P-384 point has no x coordinate"))?;
    let y = point
        .y()
        .ok_or_else(|| Error::invalid_key("P-384 point has no y coordinate"))?;

    let mut public = base_jwk("EC", Algorithm::ES384, kid);
    public.crv = Some("P-384".to_owned());
    public.x = Some(encode_member(x));
    public.y = Some(encode_member(y));

    let mut private = public.clone();
    private.d = Some(encode_member(&secret.to_bytes()));

    Ok(GeneratedKey {
        private,
        public: Some(public),
        kid,
    })
}

fn generate_ec_p521() -> Result<GeneratedKey> {
    let kid = Uuid::new_v4();

    let secret = p521::SecretKey::random(&mut OsRng);
    let point = secret.public_key().to_encoded_point(false);
    let x = point
        .x()
        .ok_or_else(|| Error::invalid_key("P-521 point has no x coordinate"))?;
    let y = point
        .y()
        .ok_or_else(|| Error::invalid_key("P-521 point has no y coordinate"))?;

    let mut public = base_jwk("EC", Algorithm::ES512, kid);
    public.crv = Some("P-521".to_owned());
    public.x = Some(encode_member(x));
    public.y = Some(encode_member(y));

    let mut private = public.clone();
    private.d = Some(encode_member(&secret.to_bytes()));

    Ok(GeneratedKey {
        private,
        public: Some(public),
        kid,
    })
}

fn generate_rsa(alg: Algorithm) -> Result<GeneratedKey> {
    let kid = Uuid::new_v4();

    let mut rng = OsRng;
    let key = RsaPrivateKey::new(&mut rng, RSA_KEY_SIZE)
        .map_err(|err| Error::internal(format!("generate RSA private key: {err}")))?;
    let public_key = RsaPublicKey::from(&key);

    let mut public = base_jwk("RSA", alg, kid);
    public.n = Some(encode_member(&public_key.n().to_bytes_be()));
    public.e = Some(encode_member(&public_key.e().to_bytes_be()));

    let primes = key.primes();
    if primes.len() < 2 {
        return Err(Error::internal("RSA key has fewer than two primes"));
    }

    let mut private = public.clone();
    private.d = Some(encode_member(&key.d().to_bytes_be()));
    private.p = Some(encode_member(&primes[0].to_bytes_be()));
    private.q = Some(encode_member(&primes[1].to_bytes_be()));

    Ok(GeneratedKey {
        private,
        public: Some(public),
        kid,
    })
}
