use der::Encode;
use x509_cert::certificate::CertificateInner;

use crate::cert::Certificate;
use crate::cert::params::CertificateTemplate;
use crate::clock::Clock;
use crate::error::{Argument, Result, TestCertError};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::TbsCertificate;
use crate::testcert::{self, CertificatePair};

/// Issues a certificate for `subject_key` from `template`, signed by
/// `issuer_key` under the name of `issuer_cert`.
///
/// Arguments are checked in order (subject key, issuer key, issuer
/// certificate, template) and the first missing one is reported as
/// [`TestCertError::MissingArgument`] before any work is done.
///
/// The returned certificate is decoded from the signed DER rather than built
/// from the template.
///
/// # Errors
/// * `SigningError` if `issuer_key` does not belong to `issuer_cert`, or
///   signing fails.
/// * `EncodingError` if the template cannot be encoded.
/// * `ParseError` if the signed bytes do not parse back.
pub fn issue_certificate(
    subject_key: Option<&PublicKey>,
    issuer_key: Option<&KeyPair>,
    issuer_cert: Option<&Certificate>,
    template: Option<&CertificateTemplate>,
) -> Result<Certificate> {
    let subject_key = subject_key.ok_or(TestCertError::MissingArgument(Argument::SubjectKey))?;
    let issuer_key = issuer_key.ok_or(TestCertError::MissingArgument(Argument::IssuerKey))?;
    let issuer_cert =
        issuer_cert.ok_or(TestCertError::MissingArgument(Argument::IssuerCertificate))?;
    let template = template.ok_or(TestCertError::MissingArgument(Argument::Template))?;

    let issuer_public_key = issuer_cert.public_key().map_err(|e| {
        TestCertError::SigningError(format!("unusable issuer certificate public key: {e}"))
    })?;
    if issuer_public_key != issuer_key.public_key() {
        return Err(TestCertError::SigningError(
            "issuer key does not match the issuer certificate's public key".to_string(),
        ));
    }

    let authority_key_id = issuer_cert.subject_key_id()?;
    let issuer_name = issuer_cert.inner.tbs_certificate.subject.clone();
    let tbs_cert =
        TbsCertificate::build(template, subject_key, issuer_key, issuer_name, authority_key_id)?;
    sign_tbs(&tbs_cert, issuer_key)
}

/// Signs `tbs_cert` and parses the resulting DER back into a [`Certificate`].
pub(crate) fn sign_tbs(tbs_cert: &TbsCertificate, signer: &KeyPair) -> Result<Certificate> {
    let tbs_certificate = tbs_cert.to_tbs_certificate_inner()?;
    let signature = signer.sign_data(&tbs_certificate.to_der()?)?;

    let cert_inner = CertificateInner {
        tbs_certificate,
        signature_algorithm: tbs_cert.signature_algorithm.into(),
        signature: der::asn1::BitString::from_bytes(&signature)?,
    };

    Certificate::from_der(&cert_inner.to_der()?)
}

/// An issuer certificate together with its private key.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl CertificateWithPrivateKey {
    /// Loads an issuer from a PEM certificate and a PEM private key.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self> {
        Ok(Self {
            cert: Certificate::from_pem(cert_pem)?,
            key: KeyPair::from_pem(key_pem)?,
        })
    }

    /// Issues a certificate for `subject_key` from `template`.
    pub fn issue(
        &self,
        subject_key: &PublicKey,
        template: &CertificateTemplate,
    ) -> Result<Certificate> {
        issue_certificate(
            Some(subject_key),
            Some(&self.key),
            Some(&self.cert),
            Some(template),
        )
    }

    /// Issues a precertificate/certificate pair, see
    /// [`issue_test_certificate`](crate::testcert::issue_test_certificate).
    pub fn issue_test_certificate(
        &self,
        base_domain: &str,
        clock: &dyn Clock,
        window_start: Option<time::OffsetDateTime>,
        window_end: Option<time::OffsetDateTime>,
    ) -> Result<CertificatePair> {
        testcert::issue_test_certificate(
            base_domain,
            &self.key,
            &self.cert,
            clock,
            window_start,
            window_end,
        )
    }
}
