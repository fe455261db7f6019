use bon::Builder;
use const_oid::ObjectIdentifier;
use der::asn1::{Any, PrintableStringRef, SetOfVec, Utf8StringRef};
use der::{Tag, Tagged};
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{Name, RdnSequence, RelativeDistinguishedName};

use super::extensions::{ExtendedKeyUsageOption, FlagSet, KeyUsages, ToAndFromX509Extension};
use crate::error::{Result, TestCertError};

/// Everything signed into a certificate apart from the subject key and the
/// issuer.
///
/// A template is consumed by [`issue_certificate`](crate::issuer::issue_certificate)
/// and never appears on the wire itself.
///
/// # Fields
/// * `common_name` - The subject common name (CN).
/// * `dns_names` - DNS Subject Alternative Names.
/// * `serial_number` - The certificate serial number.
/// * `validity` - The `notBefore`/`notAfter` window.
/// * `key_usage` - Key usage bits; an empty set omits the extension.
/// * `extended_key_usage` - Extended key usages.
/// * `is_ca` - The basic constraints CA flag.
/// * `issuing_certificate_urls` - Authority Information Access `caIssuers` URLs.
/// * `crl_distribution_points` - CRL distribution point URLs.
/// * `extra_extensions` - Extensions appended verbatim after the standard ones.
#[derive(Clone, Debug, Builder)]
pub struct CertificateTemplate {
    pub common_name: String,
    #[builder(default)]
    pub dns_names: Vec<String>,
    pub serial_number: u64,
    pub validity: Validity,
    #[builder(default)]
    pub key_usage: FlagSet<KeyUsages>,
    #[builder(default)]
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub is_ca: bool,
    #[builder(default)]
    pub issuing_certificate_urls: Vec<String>,
    #[builder(default)]
    pub crl_distribution_points: Vec<String>,
    #[builder(default)]
    pub extra_extensions: Vec<ExtensionParam>,
}

impl CertificateTemplate {
    /// Builds the subject name, a single RDN holding the common name.
    pub fn subject_name(&self) -> Result<Name> {
        common_name_to_x509_name(&self.common_name)
    }

    /// The serial number as its shortest big-endian byte string.
    pub fn serial_bytes(&self) -> Vec<u8> {
        serial_to_bytes(self.serial_number)
    }
}

/// Returns the minimal big-endian bytes of `serial`; zero is encoded as a
/// single zero byte.
pub fn serial_to_bytes(serial: u64) -> Vec<u8> {
    let bytes = serial.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
    bytes[first..].to_vec()
}

/// Encodes a common name as PrintableString when every character allows it,
/// otherwise as UTF8String.
pub fn common_name_to_x509_name(common_name: &str) -> Result<Name> {
    let value = match PrintableStringRef::new(common_name) {
        Ok(printable) => Any::encode_from(&printable)?,
        Err(_) => Any::encode_from(&Utf8StringRef::new(common_name)?)?,
    };
    let attribute = AttributeTypeAndValue {
        oid: const_oid::db::rfc4519::CN,
        value,
    };
    let rdn = RelativeDistinguishedName(SetOfVec::try_from(vec![attribute])?);
    Ok(RdnSequence(vec![rdn]))
}

/// Finds the first common name in `name`.
pub fn common_name_from_x509_name(name: &Name) -> Option<String> {
    name.0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|attr| attr.oid == const_oid::db::rfc4519::CN)
        .and_then(|attr| match attr.value.tag() {
            Tag::PrintableString => attr
                .value
                .decode_as::<PrintableStringRef<'_>>()
                .ok()
                .map(|s| s.to_string()),
            Tag::Utf8String => attr
                .value
                .decode_as::<Utf8StringRef<'_>>()
                .ok()
                .map(|s| s.to_string()),
            _ => None,
        })
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
///
/// # Fields
/// * `not_before` - The start of the validity period.
/// * `not_after` - The end of the validity period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// A validity period of `period` starting at `not_before`.
    pub fn starting_at(not_before: OffsetDateTime, period: time::Duration) -> Result<Self> {
        let not_after = not_before
            .checked_add(period)
            .ok_or_else(|| out_of_range(not_before, period))?;
        Ok(Self {
            not_before,
            not_after,
        })
    }

    /// A validity period of `period` ending at `not_after`.
    pub fn ending_at(not_after: OffsetDateTime, period: time::Duration) -> Result<Self> {
        let not_before = not_after
            .checked_sub(period)
            .ok_or_else(|| out_of_range(not_after, -period))?;
        Ok(Self {
            not_before,
            not_after,
        })
    }
}

pub(crate) fn out_of_range(instant: OffsetDateTime, offset: time::Duration) -> TestCertError {
    TestCertError::EncodingError(format!(
        "{instant} offset by {offset} is outside the representable time range"
    ))
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    ///
    /// # Arguments
    /// * `extension` - The extension to encode.
    /// * `critical` - Indicates if the extension is critical.
    pub fn from_extension<E: ToAndFromX509Extension>(extension: E, critical: bool) -> Result<Self> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E> {
        if self.oid != E::OID {
            return Err(TestCertError::InvalidInput(format!(
                "extension {} is not {}",
                self.oid,
                E::OID
            )));
        }
        E::from_x509_extension_value(&self.value)
    }
}

impl From<&x509_cert::ext::Extension> for ExtensionParam {
    fn from(ext: &x509_cert::ext::Extension) -> Self {
        Self {
            oid: ext.extn_id,
            critical: ext.critical,
            value: ext.extn_value.as_bytes().to_vec(),
        }
    }
}
