use const_oid::ObjectIdentifier;
use const_oid::db::rfc5912::{ID_EC_PUBLIC_KEY, SECP_256_R_1, SECP_384_R_1};
use ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{
    DerSignature as P256DerSignature, SigningKey as P256SigningKey,
    VerifyingKey as P256VerifyingKey,
};
use p384::ecdsa::{
    DerSignature as P384DerSignature, SigningKey as P384SigningKey,
    VerifyingKey as P384VerifyingKey,
};
use pkcs8::DecodePrivateKey;
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::SignatureAlgorithm;
use crate::error::{Result, TestCertError};
use crate::pem_utils;

/// Private keys usable for signing certificates.
///
/// Test certificate subjects always get a P-256 key; issuers may also hold a
/// P-384 key.
#[derive(Clone, Debug)]
pub enum KeyPair {
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
}

impl From<P256SigningKey> for KeyPair {
    fn from(signing_key: P256SigningKey) -> Self {
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }
}

impl From<P384SigningKey> for KeyPair {
    fn from(signing_key: P384SigningKey) -> Self {
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }
}

impl KeyPair {
    /// Returns the public half of this key pair.
    pub fn public_key(&self) -> PublicKey {
        match self {
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
        }
    }

    /// The algorithm certificates signed by this key are labelled with.
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        match self {
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::Sha256WithECDSA,
            KeyPair::EcdsaP384 { .. } => SignatureAlgorithm::Sha384WithECDSA,
        }
    }

    /// Signs `data`, returning a DER-encoded ECDSA signature.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: P256DerSignature = signing_key
                    .try_sign(data)
                    .map_err(|e| TestCertError::SigningError(e.to_string()))?;
                Ok(signature.as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: P384DerSignature = signing_key
                    .try_sign(data)
                    .map_err(|e| TestCertError::SigningError(e.to_string()))?;
                Ok(signature.as_bytes().to_vec())
            }
        }
    }

    /// Imports a private key from PEM. Both `PRIVATE KEY` (PKCS#8) and
    /// `EC PRIVATE KEY` (SEC1) blocks are accepted.
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let (label, der) = pem_utils::pem_to_der(pem_str)?;
        match label.as_str() {
            "PRIVATE KEY" => Self::from_pkcs8_der(&der),
            "EC PRIVATE KEY" => Self::from_sec1_der(&der),
            other => Err(TestCertError::DecodingError(format!(
                "unsupported private key PEM label {other:?}"
            ))),
        }
    }

    /// Imports a DER private key, trying PKCS#8 first and SEC1 second.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_pkcs8_der(der).or_else(|_| Self::from_sec1_der(der))
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        if let Ok(signing_key) = P256SigningKey::from_pkcs8_der(der) {
            return Ok(signing_key.into());
        }
        P384SigningKey::from_pkcs8_der(der)
            .map(Into::into)
            .map_err(|e| TestCertError::DecodingError(e.to_string()))
    }

    pub fn from_sec1_der(der: &[u8]) -> Result<Self> {
        if let Ok(secret_key) = p256::SecretKey::from_sec1_der(der) {
            return Ok(P256SigningKey::from(secret_key).into());
        }
        p384::SecretKey::from_sec1_der(der)
            .map(|secret_key| P384SigningKey::from(secret_key).into())
            .map_err(|e| TestCertError::DecodingError(e.to_string()))
    }
}

/// Public keys that can be certified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublicKey {
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
}

impl PublicKey {
    /// Encodes the key as a SubjectPublicKeyInfo.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        match self {
            PublicKey::EcdsaP256(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
            PublicKey::EcdsaP384(verifying_key) => {
                SubjectPublicKeyInfoOwned::from_key(*verifying_key)
            }
        }
        .map_err(|e| TestCertError::EncodingError(e.to_string()))
    }

    /// Decodes an ECDSA SubjectPublicKeyInfo on one of the supported curves.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        if spki.algorithm.oid != ID_EC_PUBLIC_KEY {
            return Err(TestCertError::DecodingError(format!(
                "unsupported public key algorithm {}",
                spki.algorithm.oid
            )));
        }
        let params = spki.algorithm.parameters.as_ref().ok_or_else(|| {
            TestCertError::DecodingError("EC public key is missing curve parameters".to_string())
        })?;
        let curve = ObjectIdentifier::from_bytes(params.value())
            .map_err(|e| TestCertError::DecodingError(e.to_string()))?;
        let point = spki.subject_public_key.raw_bytes();

        if curve == SECP_256_R_1 {
            P256VerifyingKey::from_sec1_bytes(point)
                .map(PublicKey::EcdsaP256)
                .map_err(|e| TestCertError::DecodingError(e.to_string()))
        } else if curve == SECP_384_R_1 {
            P384VerifyingKey::from_sec1_bytes(point)
                .map(PublicKey::EcdsaP384)
                .map_err(|e| TestCertError::DecodingError(e.to_string()))
        } else {
            Err(TestCertError::DecodingError(format!(
                "unsupported EC curve {curve}"
            )))
        }
    }

    /// Verifies a DER-encoded ECDSA signature over `data`.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<()> {
        match self {
            PublicKey::EcdsaP256(verifying_key) => {
                let signature = P256DerSignature::from_bytes(signature)
                    .map_err(|e| TestCertError::DecodingError(e.to_string()))?;
                verifying_key
                    .verify(data, &signature)
                    .map_err(|e| TestCertError::SigningError(e.to_string()))
            }
            PublicKey::EcdsaP384(verifying_key) => {
                let signature = P384DerSignature::from_bytes(signature)
                    .map_err(|e| TestCertError::DecodingError(e.to_string()))?;
                verifying_key
                    .verify(data, &signature)
                    .map_err(|e| TestCertError::SigningError(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkcs8::EncodePrivateKey;

    #[test]
    fn test_spki_round_trip() {
        let key = crate::pki::rand_key().unwrap();
        let spki = key.public_key().to_spki().unwrap();
        let decoded = PublicKey::from_x509spki(&spki).unwrap();
        assert_eq!(key.public_key(), decoded);
    }

    #[test]
    fn test_sign_and_verify() {
        let key = crate::pki::rand_key().unwrap();
        let signature = key.sign_data(b"to be signed").unwrap();
        key.public_key().verify(b"to be signed", &signature).unwrap();
        assert!(key.public_key().verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn test_import_pkcs8_pem() {
        let signing_key = P384SigningKey::random(&mut rand_core::OsRng);
        let pem = signing_key
            .to_pkcs8_pem(pkcs8::LineEnding::LF)
            .unwrap()
            .to_string();
        let imported = KeyPair::from_pem(&pem).unwrap();
        assert!(matches!(imported, KeyPair::EcdsaP384 { .. }));
        assert_eq!(
            imported.public_key(),
            PublicKey::EcdsaP384(*signing_key.verifying_key())
        );
    }

    #[test]
    fn test_import_sec1_pem() {
        let secret_key = p256::SecretKey::random(&mut rand_core::OsRng);
        let der = secret_key.to_sec1_der().unwrap();
        let pem = pem_utils::der_to_pem(&der, "EC PRIVATE KEY");
        let imported = KeyPair::from_pem(&pem).unwrap();
        assert_eq!(
            imported.public_key(),
            PublicKey::EcdsaP256(*P256SigningKey::from(secret_key).verifying_key())
        );
    }

    #[test]
    fn test_import_der_tries_pkcs8_then_sec1() {
        let p256_key = P256SigningKey::random(&mut rand_core::OsRng);
        let pkcs8_der = p256_key.to_pkcs8_der().unwrap();
        let imported = KeyPair::from_der(pkcs8_der.as_bytes()).unwrap();
        assert_eq!(
            imported.public_key(),
            PublicKey::EcdsaP256(*p256_key.verifying_key())
        );

        let p384_secret = p384::SecretKey::random(&mut rand_core::OsRng);
        let sec1_der = p384_secret.to_sec1_der().unwrap();
        let imported = KeyPair::from_der(&sec1_der).unwrap();
        assert!(matches!(imported, KeyPair::EcdsaP384 { .. }));
        assert_eq!(
            imported.public_key(),
            PublicKey::EcdsaP384(*P384SigningKey::from(p384_secret).verifying_key())
        );
    }

    #[test]
    fn test_import_der_rejects_garbage() {
        assert!(matches!(
            KeyPair::from_der(b"not a private key"),
            Err(TestCertError::DecodingError(_))
        ));
        assert!(matches!(
            KeyPair::from_der(&[]),
            Err(TestCertError::DecodingError(_))
        ));
    }

    #[test]
    fn test_import_rejects_unknown_label() {
        let pem = pem_utils::der_to_pem(&[0x30, 0x00], "RSA PRIVATE KEY");
        assert!(matches!(
            KeyPair::from_pem(&pem),
            Err(TestCertError::DecodingError(_))
        ));
    }
}
