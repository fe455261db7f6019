pub mod extensions;
pub mod params;

use der::{Decode, Encode, EncodePem};
use extensions::{
    BasicConstraints, CT_POISON_OID, SubjectAltName, SubjectKeyIdentifier,
    ToAndFromX509Extension,
};
use params::{CertificateTemplate, ExtensionParam};
use time::OffsetDateTime;
use x509_cert::certificate::CertificateInner;

use crate::error::{Result, TestCertError};
use crate::key::{KeyPair, PublicKey};
use crate::pem_utils;
use crate::tbs_certificate::{TbsCertificate, from_x509_time, key_identifier};

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SHA-256 with ECDSA.
    Sha256WithECDSA,
    /// SHA-384 with ECDSA.
    Sha384WithECDSA,
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// ECDSA algorithm identifiers carry no parameters (RFC 5758 section 3.2).
    fn from(value: SignatureAlgorithm) -> Self {
        match value {
            SignatureAlgorithm::Sha256WithECDSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
                parameters: None,
            },
            SignatureAlgorithm::Sha384WithECDSA => x509_cert::spki::AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ECDSA_WITH_SHA_384,
                parameters: None,
            },
        }
    }
}

/// Represents a parsed X.509 certificate.
///
/// Certificates produced by this crate are always decoded from their own
/// signed DER, so what the accessors report is what any other parser of the
/// same bytes sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| TestCertError::ParseError(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Parses a PEM `CERTIFICATE` block.
    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let (label, der) = pem_utils::pem_to_der(pem_str)?;
        if label != "CERTIFICATE" {
            return Err(TestCertError::DecodingError(format!(
                "expected a CERTIFICATE PEM block, got {label:?}"
            )));
        }
        Self::from_der(&der)
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| TestCertError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| TestCertError::EncodingError(e.to_string()))
    }

    /// DER encoding of the signed portion of the certificate.
    pub fn tbs_der(&self) -> Result<Vec<u8>> {
        Ok(self.inner.tbs_certificate.to_der()?)
    }

    /// The raw signature value.
    pub fn signature(&self) -> &[u8] {
        self.inner.signature.raw_bytes()
    }

    /// Verifies that this certificate was signed by `issuer`.
    pub fn verify_signed_by(&self, issuer: &PublicKey) -> Result<()> {
        issuer.verify(&self.tbs_der()?, self.signature())
    }

    /// The serial number as big-endian magnitude bytes.
    pub fn serial_number(&self) -> Vec<u8> {
        let bytes = self.inner.tbs_certificate.serial_number.as_bytes();
        match bytes {
            [0, rest @ ..] if !rest.is_empty() => rest.to_vec(),
            _ => bytes.to_vec(),
        }
    }

    /// The serial number, when it fits in a `u64`.
    pub fn serial_u64(&self) -> Option<u64> {
        let bytes = self.serial_number();
        if bytes.len() > 8 {
            return None;
        }
        Some(bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    /// The first subject common name, if any.
    pub fn common_name(&self) -> Option<String> {
        params::common_name_from_x509_name(&self.inner.tbs_certificate.subject)
    }

    /// DNS names from the Subject Alternative Name extension.
    pub fn dns_names(&self) -> Result<Vec<String>> {
        match self.extension(SubjectAltName::OID) {
            Some(ext) => Ok(ext.to_extension::<SubjectAltName>()?.names),
            None => Ok(Vec::new()),
        }
    }

    pub fn not_before(&self) -> Result<OffsetDateTime> {
        from_x509_time(&self.inner.tbs_certificate.validity.not_before)
    }

    pub fn not_after(&self) -> Result<OffsetDateTime> {
        from_x509_time(&self.inner.tbs_certificate.validity.not_after)
    }

    /// All extensions in certificate order.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(ExtensionParam::from)
            .collect()
    }

    /// The first extension with the given OID.
    pub fn extension(&self, oid: const_oid::ObjectIdentifier) -> Option<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == oid)
            .map(ExtensionParam::from)
    }

    /// Whether the certificate carries the CT precertificate poison.
    pub fn has_ct_poison(&self) -> bool {
        self.extension(CT_POISON_OID).is_some()
    }

    pub fn is_ca(&self) -> Result<bool> {
        match self.extension(BasicConstraints::OID) {
            Some(ext) => Ok(ext.to_extension::<BasicConstraints>()?.is_ca),
            None => Ok(false),
        }
    }

    /// The subject key identifier, if present.
    pub fn subject_key_id(&self) -> Result<Option<Vec<u8>>> {
        self.extension(SubjectKeyIdentifier::OID)
            .map(|ext| {
                ext.to_extension::<SubjectKeyIdentifier>()
                    .map(|ski| ski.key_identifier)
            })
            .transpose()
    }

    /// The certified public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Creates a new self-signed certificate, typically a test issuer.
    ///
    /// # Arguments
    /// * `template` - The fields to sign.
    /// * `key` - The key pair that is both certified and signing.
    pub fn new_self_signed(template: &CertificateTemplate, key: &KeyPair) -> Result<Self> {
        let subject_public_key = key.public_key();
        let issuer = template.subject_name()?;
        let authority_key_id = if template.is_ca {
            Some(key_identifier(&subject_public_key)?)
        } else {
            None
        };
        let tbs_cert =
            TbsCertificate::build(template, &subject_public_key, key, issuer, authority_key_id)?;
        crate::issuer::sign_tbs(&tbs_cert, key)
    }
}
