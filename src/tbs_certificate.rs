use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use sha1::{Digest, Sha1};
use time::{OffsetDateTime, UtcOffset};
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::Time;

use crate::cert::SignatureAlgorithm;
use crate::cert::extensions::{
    AuthorityInfoAccess, AuthorityKeyIdentifier, BasicConstraints, CrlDistributionPoints,
    ExtendedKeyUsage, KeyUsage, SubjectAltName, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use crate::cert::params::{CertificateTemplate, ExtensionParam, Validity};
use crate::error::{Result, TestCertError};
use crate::key::{KeyPair, PublicKey};

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `signature_algorithm` - The algorithm used to sign the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key_info` - The public key of the certificate subject.
/// * `extensions` - X.509 extensions in encoding order.
#[derive(Clone, Debug)]
pub struct TbsCertificate {
    pub serial_number: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key_info: SubjectPublicKeyInfoOwned,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Lays out the to-be-signed fields for `template`.
    ///
    /// Standard extensions come first in the order KeyUsage, ExtendedKeyUsage,
    /// BasicConstraints, SubjectKeyIdentifier, AuthorityKeyIdentifier,
    /// AuthorityInfoAccess, SubjectAltName, CrlDistributionPoints. The
    /// template's extra extensions follow, and a standard extension whose OID
    /// also appears among them is left out.
    ///
    /// # Arguments
    /// * `template` - The certificate fields.
    /// * `subject_public_key` - The key being certified.
    /// * `signer` - The issuer key, which selects the signature algorithm.
    /// * `issuer` - The issuer name, normally the issuer certificate's subject.
    /// * `authority_key_id` - Key identifier of the issuer, if known.
    pub fn build(
        template: &CertificateTemplate,
        subject_public_key: &PublicKey,
        signer: &KeyPair,
        issuer: Name,
        authority_key_id: Option<Vec<u8>>,
    ) -> Result<Self> {
        let mut extensions = StandardExtensions::new(&template.extra_extensions);

        if !template.key_usage.is_empty() {
            extensions.push(KeyUsage(template.key_usage), true)?;
        }
        if !template.extended_key_usage.is_empty() {
            let eku = ExtendedKeyUsage {
                usage: template.extended_key_usage.clone(),
            };
            extensions.push(eku, false)?;
        }
        let basic_constraints = BasicConstraints {
            is_ca: template.is_ca,
        };
        extensions.push(basic_constraints, true)?;
        if template.is_ca {
            let ski = SubjectKeyIdentifier {
                key_identifier: key_identifier(subject_public_key)?,
            };
            extensions.push(ski, false)?;
        }
        if let Some(key_identifier) = authority_key_id {
            extensions.push(AuthorityKeyIdentifier { key_identifier }, false)?;
        }
        if !template.issuing_certificate_urls.is_empty() {
            let aia = AuthorityInfoAccess {
                issuing_certificate_urls: template.issuing_certificate_urls.clone(),
            };
            extensions.push(aia, false)?;
        }
        if !template.dns_names.is_empty() {
            let san = SubjectAltName {
                names: template.dns_names.clone(),
            };
            extensions.push(san, false)?;
        }
        if !template.crl_distribution_points.is_empty() {
            let crldp = CrlDistributionPoints {
                urls: template.crl_distribution_points.clone(),
            };
            extensions.push(crldp, false)?;
        }

        Ok(Self {
            serial_number: template.serial_bytes(),
            signature_algorithm: signer.signature_algorithm(),
            issuer,
            validity: template.validity,
            subject: template.subject_name()?,
            subject_public_key_info: subject_public_key.to_spki()?,
            extensions: extensions.finish(),
        })
    }

    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        // Serial numbers are positive INTEGERs.
        let mut serial_number = self.serial_number.clone();
        if serial_number.first().is_some_and(|b| b & 0x80 != 0) {
            serial_number.insert(0, 0);
        }

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: SerialNumber::new(&serial_number)?,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key_info.clone(),
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }
}

struct StandardExtensions<'a> {
    extra: &'a [ExtensionParam],
    extensions: Vec<ExtensionParam>,
}

impl<'a> StandardExtensions<'a> {
    fn new(extra: &'a [ExtensionParam]) -> Self {
        Self {
            extra,
            extensions: Vec::new(),
        }
    }

    fn push<E: ToAndFromX509Extension>(&mut self, extension: E, critical: bool) -> Result<()> {
        if self.extra.iter().any(|ext| ext.oid == E::OID) {
            return Ok(());
        }
        self.extensions
            .push(ExtensionParam::from_extension(extension, critical)?);
        Ok(())
    }

    fn finish(mut self) -> Vec<ExtensionParam> {
        self.extensions.extend(self.extra.iter().cloned());
        self.extensions
    }
}

const ENCODABLE_YEARS: std::ops::RangeInclusive<u16> = 1970..=9999;

/// SHA-1 over the subject public key bits (RFC 5280 section 4.2.1.2, method 1).
pub fn key_identifier(public_key: &PublicKey) -> Result<Vec<u8>> {
    let spki = public_key.to_spki()?;
    Ok(Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec())
}

/// UTCTime through 2049, GeneralizedTime from 2050 (RFC 5280 section
/// 4.1.2.5). Sub-second precision is dropped.
///
/// Only years 1970 through 9999 can be encoded, so the UTCTime years 1950
/// to 1969 are rejected.
pub(crate) fn to_x509_time(instant: OffsetDateTime) -> Result<Time> {
    let instant = instant.to_offset(UtcOffset::UTC);
    let year = u16::try_from(instant.year())
        .ok()
        .filter(|year| ENCODABLE_YEARS.contains(year))
        .ok_or_else(|| {
            TestCertError::EncodingError(format!(
                "year {} is outside the encodable range {}-{}",
                instant.year(),
                ENCODABLE_YEARS.start(),
                ENCODABLE_YEARS.end()
            ))
        })?;
    let date_time = der::DateTime::new(
        year,
        u8::from(instant.month()),
        instant.day(),
        instant.hour(),
        instant.minute(),
        instant.second(),
    )?;
    if (1950..2050).contains(&year) {
        Ok(Time::UtcTime(UtcTime::from_date_time(date_time)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_date_time(date_time)))
    }
}

pub(crate) fn from_x509_time(time: &Time) -> Result<OffsetDateTime> {
    let seconds = i64::try_from(time.to_unix_duration().as_secs())
        .map_err(|e| TestCertError::ParseError(e.to_string()))?;
    OffsetDateTime::from_unix_timestamp(seconds).map_err(|e| TestCertError::ParseError(e.to_string()))
}
