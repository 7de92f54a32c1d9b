//! ES256 key material generated per test run.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use ring::rand::SystemRandom;
use ring::signature::{ECDSA_P256_SHA256_FIXED_SIGNING, EcdsaKeyPair, KeyPair};
use serde::Serialize;
use serde_json::json;

pub(crate) struct TestKey {
    pub(crate) pkcs8: Vec<u8>,
    pub(crate) public: Vec<u8>,
}

impl TestKey {
    pub(crate) fn generate() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng).unwrap();
        let pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
                .unwrap();

        Self {
            pkcs8: pkcs8.as_ref().to_vec(),
            public: pair.public_key().as_ref().to_vec(),
        }
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_ec_der(&self.pkcs8)
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_ec_der(&self.public)
    }

    /// Single-key JWKS advertising this key under `kid`.
    pub(crate) fn jwks(&self, kid: &str) -> JwkSet {
        // Uncompressed point: 0x04 || x || y
        let x = URL_SAFE_NO_PAD.encode(&self.public[1..33]);
        let y = URL_SAFE_NO_PAD.encode(&self.public[33..65]);

        serde_json::from_value(json!({
            "keys": [{
                "kty": "EC",
                "use": "sig",
                "crv": "P-256",
                "kid": kid,
                "x": x,
                "y": y,
                "alg": "ES256"
            }]
        }))
        .unwrap()
    }

    pub(crate) fn sign<T: Serialize>(&self, kid: Option<&str>, claims: &T) -> String {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = kid.map(str::to_string);
        jsonwebtoken::encode(&header, claims, &self.encoding_key()).unwrap()
    }
}
