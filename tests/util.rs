#![allow(dead_code)]

use ct_testcert::cert::Certificate;
use ct_testcert::cert::extensions::KeyUsages;
use ct_testcert::cert::params::{CertificateTemplate, Validity};
use ct_testcert::issuer::CertificateWithPrivateKey;
use ct_testcert::key::KeyPair;
use ct_testcert::pki;
use time::OffsetDateTime;
use time::macros::datetime;

/// A fixed instant with no sub-second part, so it survives certificate
/// time encoding unchanged.
pub const NOW: OffsetDateTime = datetime!(2026-03-01 12:00:00 UTC);

pub fn generate_ca_cert_with_key(ca_key: KeyPair) -> CertificateWithPrivateKey {
    let ca_template = CertificateTemplate::builder()
        .common_name("myca.local".to_string())
        .serial_number(1)
        .validity(Validity::starting_at(
            NOW - time::Duration::days(1),
            time::Duration::days(3650),
        ).unwrap())
        .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
        .is_ca(true)
        .build();

    CertificateWithPrivateKey {
        cert: Certificate::new_self_signed(&ca_template, &ca_key).unwrap(),
        key: ca_key,
    }
}

pub fn generate_ca_cert() -> CertificateWithPrivateKey {
    generate_ca_cert_with_key(pki::rand_key().unwrap())
}
