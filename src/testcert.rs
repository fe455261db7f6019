//! Issuance of matched precertificate/certificate pairs for submission to
//! Certificate Transparency logs.
//!
//! The certificates are not issued by a trusted root, but they are shaped to
//! pass common linting so log monitors do not need to special-case them.

use time::{Duration, OffsetDateTime};

use crate::cert::Certificate;
use crate::cert::extensions::{CtPoison, ExtendedKeyUsageOption, KeyUsages};
use crate::cert::params::{
    CertificateTemplate, ExtensionParam, Validity, out_of_range, serial_to_bytes,
};
use crate::clock::Clock;
use crate::error::{Result, TestCertError};
use crate::issuer::issue_certificate;
use crate::key::{KeyPair, PublicKey};
use crate::pki::{rand_key, rand_serial};

/// Domain suffix used for test certificate subjects when the caller supplies
/// none. The leading label is derived from the serial number.
pub const DEFAULT_TEST_CERT_DOMAIN: &str = ".woodpecker.testing.letsencrypt.org";

/// 90 days minus one second: RFC 5280 counts `notAfter` as inclusive while
/// interval arithmetic here treats the end as exclusive.
pub const VALIDITY_PERIOD: Duration = Duration::seconds(90 * 24 * 60 * 60 - 1);

/// Distance kept between `notAfter` and the end of a temporal shard window.
pub const WINDOW_END_MARGIN: Duration = Duration::hours(1);

/// Number of leading serial bytes hex-encoded into the subject label.
pub const SERIAL_LABEL_BYTES: usize = 5;

/// A precertificate and the matching final certificate.
///
/// Both share serial number, subject key, subject name, DNS name and
/// validity; only `pre_cert` carries the CT poison extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificatePair {
    pub pre_cert: Certificate,
    pub cert: Certificate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LeafKind {
    Precert,
    Final,
}

/// Issues a precertificate and a matching final leaf certificate with
/// `issuer_key` and `issuer_cert`.
///
/// The subject common name (and sole DNS name) is a hex label derived from a
/// fresh random serial followed by `base_domain`, or by
/// [`DEFAULT_TEST_CERT_DOMAIN`] when `base_domain` is empty. A non-empty
/// `base_domain` must start with `.`.
///
/// `notBefore` is the current time of `clock` and the certificate is valid
/// for [`VALIDITY_PERIOD`]. When `window_end` is given and that `notAfter`
/// falls before `window_start` or after `window_end`, the certificate is
/// moved so that `notAfter` is [`WINDOW_END_MARGIN`] before `window_end`.
/// `window_start` is only consulted in that case.
pub fn issue_test_certificate(
    base_domain: &str,
    issuer_key: &KeyPair,
    issuer_cert: &Certificate,
    clock: &dyn Clock,
    window_start: Option<OffsetDateTime>,
    window_end: Option<OffsetDateTime>,
) -> Result<CertificatePair> {
    let base_domain = resolve_base_domain(base_domain)?;

    let cert_key = rand_key()?;
    let serial = rand_serial()?;

    let validity = validity_window(clock.now(), window_start, window_end)?;
    let domain = subject_domain(serial, base_domain);

    let subject_key = cert_key.public_key();
    let issue_leaf = |kind: LeafKind| -> Result<Certificate> {
        let template = leaf_template(&domain, base_domain, serial, validity, kind)?;
        issue_certificate(
            Some(&subject_key),
            Some(issuer_key),
            Some(issuer_cert),
            Some(&template),
        )
    };

    let pre_cert = issue_leaf(LeafKind::Precert)?;
    let cert = issue_leaf(LeafKind::Final)?;

    tracing::debug!(
        serial,
        domain = %domain,
        not_before = %validity.not_before,
        not_after = %validity.not_after,
        "issued test certificate pair"
    );

    Ok(CertificatePair { pre_cert, cert })
}

fn resolve_base_domain(base_domain: &str) -> Result<&str> {
    if base_domain.is_empty() {
        return Ok(DEFAULT_TEST_CERT_DOMAIN);
    }
    if !base_domain.starts_with('.') {
        return Err(TestCertError::InvalidBaseDomain(base_domain.to_string()));
    }
    Ok(base_domain)
}

/// Computes the validity window starting at `now`, realigned to the end of
/// `[window_start, window_end]` if the default `notAfter` falls outside it.
///
/// Fails with [`TestCertError::EncodingError`] when the resulting period
/// leaves the representable time range.
pub fn validity_window(
    now: OffsetDateTime,
    window_start: Option<OffsetDateTime>,
    window_end: Option<OffsetDateTime>,
) -> Result<Validity> {
    let validity = Validity::starting_at(now, VALIDITY_PERIOD)?;

    let Some(window_end) = window_end else {
        return Ok(validity);
    };
    let before_start = window_start.is_some_and(|start| validity.not_after < start);
    if !before_start && validity.not_after <= window_end {
        return Ok(validity);
    }

    let not_after = window_end
        .checked_sub(WINDOW_END_MARGIN)
        .ok_or_else(|| out_of_range(window_end, -WINDOW_END_MARGIN))?;
    let realigned = Validity::ending_at(not_after, VALIDITY_PERIOD)?;
    tracing::debug!(
        default_not_after = %validity.not_after,
        not_after = %realigned.not_after,
        "realigned test certificate validity to temporal shard window"
    );
    Ok(realigned)
}

/// Hex encoding of the leading serial bytes followed by `base_domain`.
pub fn subject_domain(serial: u64, base_domain: &str) -> String {
    let bytes = serial_to_bytes(serial);
    let label_len = bytes.len().min(SERIAL_LABEL_BYTES);
    hex::encode(&bytes[..label_len]) + base_domain
}

fn leaf_template(
    domain: &str,
    base_domain: &str,
    serial: u64,
    validity: Validity,
    kind: LeafKind,
) -> Result<CertificateTemplate> {
    let extra_extensions = match kind {
        LeafKind::Precert => vec![ExtensionParam::from_extension(CtPoison, true)?],
        LeafKind::Final => Vec::new(),
    };

    Ok(CertificateTemplate::builder()
        .common_name(domain.to_string())
        .dns_names(vec![domain.to_string()])
        .serial_number(serial)
        .validity(validity)
        .key_usage(KeyUsages::DigitalSignature.into())
        .extended_key_usage(vec![
            ExtendedKeyUsageOption::ServerAuth,
            ExtendedKeyUsageOption::ClientAuth,
        ])
        .is_ca(false)
        .issuing_certificate_urls(vec![format!("http://issuer{base_domain}")])
        .crl_distribution_points(vec![format!("http://crls{base_domain}")])
        .extra_extensions(extra_extensions)
        .build())
}

impl CertificatePair {
    /// The subject key shared by both certificates.
    pub fn public_key(&self) -> Result<PublicKey> {
        self.cert.public_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-03-01 00:00:00 UTC);

    #[test]
    fn test_validity_period_is_ninety_days_minus_one_second() {
        assert_eq!(VALIDITY_PERIOD, Duration::days(90) - Duration::seconds(1));
    }

    #[test]
    fn test_no_window_starts_now() {
        let validity = validity_window(NOW, None, None).unwrap();
        assert_eq!(validity.not_before, NOW);
        assert_eq!(validity.not_after, NOW + VALIDITY_PERIOD);
    }

    #[test]
    fn test_window_containing_not_after_is_left_alone() {
        let validity =
            validity_window(NOW, Some(NOW), Some(NOW + Duration::days(365))).unwrap();
        assert_eq!(validity.not_before, NOW);
    }

    #[test]
    fn test_not_after_exactly_on_window_end_is_inside() {
        let end = NOW + VALIDITY_PERIOD;
        let validity = validity_window(NOW, Some(NOW), Some(end)).unwrap();
        assert_eq!(validity.not_after, end);
    }

    #[test]
    fn test_narrow_window_realigns_to_window_end() {
        let start = NOW - Duration::days(30);
        let end = NOW + Duration::days(10);
        let validity = validity_window(NOW, Some(start), Some(end)).unwrap();
        assert_eq!(validity.not_after, end - Duration::hours(1));
        assert_eq!(validity.not_after - validity.not_before, VALIDITY_PERIOD);
    }

    #[test]
    fn test_future_window_realigns_to_window_end() {
        let start = NOW + Duration::days(365);
        let end = NOW + Duration::days(730);
        let validity = validity_window(NOW, Some(start), Some(end)).unwrap();
        assert_eq!(validity.not_after, end - WINDOW_END_MARGIN);
    }

    #[test]
    fn test_window_start_without_end_has_no_effect() {
        let validity = validity_window(NOW, Some(NOW + Duration::days(365)), None).unwrap();
        assert_eq!(validity.not_before, NOW);
    }

    #[test]
    fn test_window_end_without_start_checks_end_only() {
        let end = NOW + Duration::days(10);
        let validity = validity_window(NOW, None, Some(end)).unwrap();
        assert_eq!(validity.not_after, end - WINDOW_END_MARGIN);

        let validity = validity_window(NOW, None, Some(NOW + Duration::days(365))).unwrap();
        assert_eq!(validity.not_before, NOW);
    }

    #[test]
    fn test_window_outside_time_range_is_an_error() {
        let min = time::Date::MIN.midnight().assume_utc();
        assert!(matches!(
            validity_window(NOW, None, Some(min)),
            Err(TestCertError::EncodingError(_))
        ));

        let max = time::Date::MAX.midnight().assume_utc();
        assert!(matches!(
            validity_window(max, None, None),
            Err(TestCertError::EncodingError(_))
        ));
    }

    #[test]
    fn test_subject_domain_uses_leading_serial_bytes() {
        assert_eq!(
            subject_domain(0x0102_0304_0506_0708, ".example.org"),
            "0102030405.example.org"
        );
        assert_eq!(subject_domain(0xabcd, ".example.org"), "abcd.example.org");
    }

    #[test]
    fn test_resolve_base_domain() {
        assert_eq!(resolve_base_domain("").unwrap(), DEFAULT_TEST_CERT_DOMAIN);
        assert_eq!(resolve_base_domain(".example").unwrap(), ".example");
        assert_eq!(
            resolve_base_domain("example"),
            Err(TestCertError::InvalidBaseDomain("example".to_string()))
        );
    }
}
