use const_oid::AssociatedOid;
use der::{
    Decode, Encode,
    asn1::{Ia5String, Null, OctetString},
    oid::ObjectIdentifier,
};
use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{AccessDescription, AuthorityInfoAccessSyntax};

pub use der::flagset::FlagSet;
use x509_cert::ext::pkix::KeyUsage as X509KeyUsage;
pub use x509_cert::ext::pkix::KeyUsages;

use crate::error::TestCertError;

/// OIDExtensionCTPoison, RFC 6962 section 3.1.
pub const CT_POISON_OID: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.4.1.11129.2.4.3");

/// id-ad-caIssuers, RFC 5280 section 4.2.2.1.
pub const CA_ISSUERS_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.2");

/// Trait for converting to and from X.509 extensions.
///
/// This trait provides methods to encode and decode X.509 extension values.
///
/// # Example
/// ```
/// use ct_testcert::cert::extensions::{SubjectAltName, ToAndFromX509Extension};
/// let san = SubjectAltName { names: vec!["example.com".to_string()] };
/// let encoded = san.to_x509_extension_value().unwrap();
/// let decoded = SubjectAltName::from_x509_extension_value(&encoded).unwrap();
/// assert_eq!(san.names, decoded.names);
/// ```
pub trait ToAndFromX509Extension {
    /// The Object Identifier (OID) for the extension.
    const OID: ObjectIdentifier;

    /// Encodes the extension into a DER-encoded byte vector.
    fn to_x509_extension_value(&self) -> Result<Vec<u8>, TestCertError>;

    /// Decodes the extension from a DER-encoded byte slice.
    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, TestCertError>
    where
        Self: Sized;
}

fn decoding(err: der::Error) -> TestCertError {
    TestCertError::DecodingError(err.to_string())
}

fn ia5(value: &str) -> Result<Ia5String, TestCertError> {
    Ia5String::new(value).map_err(|e| TestCertError::InvalidInput(format!("{value:?}: {e}")))
}

fn uri_names(names: &[GeneralName]) -> impl Iterator<Item = String> + '_ {
    names.iter().filter_map(|name| match name {
        GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
        _ => None,
    })
}

/// Represents the Subject Alternative Name (SAN) extension.
///
/// This extension specifies additional identities for the subject of the certificate.
///
/// # Fields
/// * `names` - A list of DNS names.
#[derive(Debug, Clone)]
pub struct SubjectAltName {
    pub names: Vec<String>,
}

impl ToAndFromX509Extension for SubjectAltName {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectAltName::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, TestCertError> {
        let san = x509_cert::ext::pkix::SubjectAltName(
            self.names
                .iter()
                .map(|name| ia5(name).map(GeneralName::DnsName))
                .collect::<Result<Vec<_>, _>>()?,
        );

        Ok(san.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, TestCertError> {
        let san = x509_cert::ext::pkix::SubjectAltName::from_der(extension).map_err(decoding)?;
        let names = san
            .0
            .iter()
            .map(|name| match name {
                GeneralName::DnsName(dns) => Ok(dns.to_string()),
                _ => Err(TestCertError::InvalidInput(
                    "Unsupported general name type".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { names })
    }
}

/// Represents the Basic Constraints extension.
///
/// This extension indicates whether the certificate is a CA certificate. No
/// path length constraint is ever written.
///
/// # Fields
/// * `is_ca` - Indicates if the certificate is a CA.
#[derive(Debug, Default)]
pub struct BasicConstraints {
    pub is_ca: bool,
}

impl ToAndFromX509Extension for BasicConstraints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::BasicConstraints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, TestCertError> {
        let bc = x509_cert::ext::pkix::BasicConstraints {
            ca: self.is_ca,
            path_len_constraint: None,
        };

        Ok(bc.to_der()?)
    }

    fn from_x509_extension_value(der_bytes: &[u8]) -> Result<Self, TestCertError> {
        let bc = x509_cert::ext::pkix::BasicConstraints::from_der(der_bytes).map_err(decoding)?;
        Ok(Self { is_ca: bc.ca })
    }
}

/// Represents the Key Usage extension.
///
/// This extension defines the purpose of the key contained in the certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyUsage(pub FlagSet<KeyUsages>);

impl ToAndFromX509Extension for KeyUsage {
    const OID: ObjectIdentifier = <X509KeyUsage as AssociatedOid>::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, TestCertError> {
        let ku = X509KeyUsage::from(self.0);
        Ok(ku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, TestCertError> {
        let ku = X509KeyUsage::from_der(extension).map_err(decoding)?;
        Ok(Self(ku.0))
    }
}

/// Represents the Extended Key Usage extension.
///
/// This extension indicates purposes for which the public key may be used.
#[derive(Debug, Clone, Default)]
pub struct ExtendedKeyUsage {
    pub usage: Vec<ExtendedKeyUsageOption>,
}

impl ToAndFromX509Extension for ExtendedKeyUsage {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::ExtendedKeyUsage::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, TestCertError> {
        let oids: Vec<ObjectIdentifier> = self.usage.iter().map(|v| (*v).into()).collect();
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage(oids);
        Ok(eku.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, TestCertError> {
        let eku = x509_cert::ext::pkix::ExtendedKeyUsage::from_der(extension).map_err(decoding)?;
        let usage = eku
            .0
            .iter()
            .map(|v| match *v {
                const_oid::db::rfc5912::ID_KP_OCSP_SIGNING => {
                    Ok(ExtendedKeyUsageOption::OcspSigning)
                }
                const_oid::db::rfc5912::ID_KP_SERVER_AUTH => Ok(ExtendedKeyUsageOption::ServerAuth),
                const_oid::db::rfc5912::ID_KP_CLIENT_AUTH => Ok(ExtendedKeyUsageOption::ClientAuth),
                const_oid::db::rfc5912::ID_KP_CODE_SIGNING => {
                    Ok(ExtendedKeyUsageOption::CodeSigning)
                }
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION => {
                    Ok(ExtendedKeyUsageOption::EmailProtection)
                }
                const_oid::db::rfc5912::ID_KP_TIME_STAMPING => {
                    Ok(ExtendedKeyUsageOption::TimeStamping)
                }
                _ => Err(TestCertError::InvalidInput(
                    "Unsupported extended key usage option".to_string(),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { usage })
    }
}

/// Represents an option for the Extended Key Usage extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtendedKeyUsageOption {
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
}

impl From<ExtendedKeyUsageOption> for ObjectIdentifier {
    fn from(value: ExtendedKeyUsageOption) -> Self {
        match value {
            ExtendedKeyUsageOption::OcspSigning => const_oid::db::rfc5912::ID_KP_OCSP_SIGNING,
            ExtendedKeyUsageOption::ServerAuth => const_oid::db::rfc5912::ID_KP_SERVER_AUTH,
            ExtendedKeyUsageOption::ClientAuth => const_oid::db::rfc5912::ID_KP_CLIENT_AUTH,
            ExtendedKeyUsageOption::CodeSigning => const_oid::db::rfc5912::ID_KP_CODE_SIGNING,
            ExtendedKeyUsageOption::EmailProtection => {
                const_oid::db::rfc5912::ID_KP_EMAIL_PROTECTION
            }
            ExtendedKeyUsageOption::TimeStamping => const_oid::db::rfc5912::ID_KP_TIME_STAMPING,
        }
    }
}

/// Represents the Subject Key Identifier (SKI) extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for SubjectKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::SubjectKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, TestCertError> {
        let ski = x509_cert::ext::pkix::SubjectKeyIdentifier(OctetString::new(
            self.key_identifier.as_slice(),
        )?);
        Ok(ski.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, TestCertError> {
        let ski =
            x509_cert::ext::pkix::SubjectKeyIdentifier::from_der(extension).map_err(decoding)?;
        Ok(Self {
            key_identifier: ski.0.as_bytes().to_vec(),
        })
    }
}

/// Represents the Authority Key Identifier (AKI) extension.
///
/// Only the `keyIdentifier` form is produced; the issuer name and serial
/// alternatives are ignored when decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyIdentifier {
    pub key_identifier: Vec<u8>,
}

impl ToAndFromX509Extension for AuthorityKeyIdentifier {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::AuthorityKeyIdentifier::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, TestCertError> {
        let aki = x509_cert::ext::pkix::AuthorityKeyIdentifier {
            key_identifier: Some(OctetString::new(self.key_identifier.as_slice())?),
            authority_cert_issuer: None,
            authority_cert_serial_number: None,
        };

        Ok(aki.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, TestCertError> {
        let aki =
            x509_cert::ext::pkix::AuthorityKeyIdentifier::from_der(extension).map_err(decoding)?;
        Ok(Self {
            key_identifier: aki
                .key_identifier
                .map(|id| id.as_bytes().to_vec())
                .unwrap_or_default(),
        })
    }
}

/// Represents the Authority Information Access extension, limited to
/// `caIssuers` URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorityInfoAccess {
    pub issuing_certificate_urls: Vec<String>,
}

impl ToAndFromX509Extension for AuthorityInfoAccess {
    const OID: ObjectIdentifier = AuthorityInfoAccessSyntax::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, TestCertError> {
        let descriptions = self
            .issuing_certificate_urls
            .iter()
            .map(|url| {
                Ok(AccessDescription {
                    access_method: CA_ISSUERS_OID,
                    access_location: GeneralName::UniformResourceIdentifier(ia5(url)?),
                })
            })
            .collect::<Result<Vec<_>, TestCertError>>()?;
        Ok(AuthorityInfoAccessSyntax(descriptions).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, TestCertError> {
        let aia = AuthorityInfoAccessSyntax::from_der(extension).map_err(decoding)?;
        let issuing_certificate_urls = aia
            .0
            .iter()
            .filter(|description| description.access_method == CA_ISSUERS_OID)
            .flat_map(|description| uri_names(std::slice::from_ref(&description.access_location)))
            .collect();
        Ok(Self {
            issuing_certificate_urls,
        })
    }
}

/// Represents the CRL Distribution Points extension. Each URL becomes its own
/// distribution point with a `fullName`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrlDistributionPoints {
    pub urls: Vec<String>,
}

impl ToAndFromX509Extension for CrlDistributionPoints {
    const OID: ObjectIdentifier = x509_cert::ext::pkix::CrlDistributionPoints::OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, TestCertError> {
        let points = self
            .urls
            .iter()
            .map(|url| {
                Ok(DistributionPoint {
                    distribution_point: Some(DistributionPointName::FullName(vec![
                        GeneralName::UniformResourceIdentifier(ia5(url)?),
                    ])),
                    reasons: None,
                    crl_issuer: None,
                })
            })
            .collect::<Result<Vec<_>, TestCertError>>()?;
        Ok(x509_cert::ext::pkix::CrlDistributionPoints(points).to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, TestCertError> {
        let crldp =
            x509_cert::ext::pkix::CrlDistributionPoints::from_der(extension).map_err(decoding)?;
        let urls = crldp
            .0
            .iter()
            .filter_map(|point| match &point.distribution_point {
                Some(DistributionPointName::FullName(names)) => Some(uri_names(names)),
                _ => None,
            })
            .flatten()
            .collect();
        Ok(Self { urls })
    }
}

/// The Certificate Transparency precertificate poison. Its value is always
/// an ASN.1 NULL and it must be marked critical.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CtPoison;

impl ToAndFromX509Extension for CtPoison {
    const OID: ObjectIdentifier = CT_POISON_OID;

    fn to_x509_extension_value(&self) -> Result<Vec<u8>, TestCertError> {
        Ok(Null.to_der()?)
    }

    fn from_x509_extension_value(extension: &[u8]) -> Result<Self, TestCertError> {
        Null::from_der(extension).map_err(decoding)?;
        Ok(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ct_poison_is_der_null() {
        assert_eq!(CtPoison.to_x509_extension_value().unwrap(), vec![0x05, 0x00]);
        assert!(CtPoison::from_x509_extension_value(&[0x05, 0x00]).is_ok());
        assert!(CtPoison::from_x509_extension_value(&[0x04, 0x00]).is_err());
    }

    #[test]
    fn test_leaf_basic_constraints_is_empty_sequence() {
        let leaf = BasicConstraints { is_ca: false };
        assert_eq!(leaf.to_x509_extension_value().unwrap(), vec![0x30, 0x00]);
    }

    #[test]
    fn test_ca_basic_constraints_has_no_path_length() {
        let encoded = BasicConstraints { is_ca: true }
            .to_x509_extension_value()
            .unwrap();
        let decoded = x509_cert::ext::pkix::BasicConstraints::from_der(&encoded).unwrap();
        assert!(decoded.ca);
        assert_eq!(decoded.path_len_constraint, None);
        assert!(BasicConstraints::from_x509_extension_value(&encoded).unwrap().is_ca);
    }

    #[test]
    fn test_key_usage_encoding_decoding() {
        let original = KeyUsage(KeyUsages::DigitalSignature.into());
        let encoded = original.to_x509_extension_value().unwrap();
        let decoded = KeyUsage::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(original, decoded);
    }

    #[test]
    fn test_authority_info_access_keeps_ca_issuers_only() {
        let ocsp = ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.48.1");
        let encoded = AuthorityInfoAccessSyntax(vec![
            AccessDescription {
                access_method: ocsp,
                access_location: GeneralName::UniformResourceIdentifier(
                    ia5("http://ocsp.example").unwrap(),
                ),
            },
            AccessDescription {
                access_method: CA_ISSUERS_OID,
                access_location: GeneralName::UniformResourceIdentifier(
                    ia5("http://issuer.example").unwrap(),
                ),
            },
        ])
        .to_der()
        .unwrap();

        let decoded = AuthorityInfoAccess::from_x509_extension_value(&encoded).unwrap();
        assert_eq!(
            decoded.issuing_certificate_urls,
            vec!["http://issuer.example".to_string()]
        );
    }

    #[test]
    fn test_crl_distribution_points_one_point_per_url() {
        let original = CrlDistributionPoints {
            urls: vec![
                "http://crls.example".to_string(),
                "http://crls2.example".to_string(),
            ],
        };
        let encoded = original.to_x509_extension_value().unwrap();
        let raw = x509_cert::ext::pkix::CrlDistributionPoints::from_der(&encoded).unwrap();
        assert_eq!(raw.0.len(), 2);
        assert_eq!(
            CrlDistributionPoints::from_x509_extension_value(&encoded).unwrap(),
            original
        );
    }

    #[test]
    fn test_non_ia5_name_is_rejected() {
        let san = SubjectAltName {
            names: vec!["dömain.example".to_string()],
        };
        assert!(matches!(
            san.to_x509_extension_value(),
            Err(TestCertError::InvalidInput(_))
        ));
    }
}
