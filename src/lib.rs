//! # ct-testcert - Test Certificate Issuance for Certificate Transparency
//!
//! ct-testcert manufactures matching precertificate/certificate pairs from an
//! issuer key and certificate, built entirely with rustcrypto libraries. The
//! pairs are meant for submission to Certificate Transparency (RFC 6962) logs
//! under test, so that a monitor can exercise real log submission paths
//! without a live public CA.
//!
//! ## What a pair looks like
//!
//! - **Subject**: a random label derived from the serial number under a base
//!   domain, used as both the common name and the sole DNS name
//! - **Key**: a fresh ECDSA P-256 key per pair
//! - **Validity**: 90 days minus one second, optionally realigned to sit just
//!   inside the end of a temporal shard window
//! - **Precertificate**: carries the critical CT poison extension
//!   (OID 1.3.6.1.4.1.11129.2.4.3, value DER NULL); the final certificate
//!   does not
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ct_testcert::{
//!     cert::{
//!         Certificate,
//!         extensions::KeyUsages,
//!         params::{CertificateTemplate, Validity},
//!     },
//!     clock::{Clock, SystemClock},
//!     pki,
//!     testcert::issue_test_certificate,
//! };
//!
//! # fn main() -> Result<(), ct_testcert::error::TestCertError> {
//! // A self-signed issuer for testing
//! let issuer_key = pki::rand_key()?;
//! let issuer_template = CertificateTemplate::builder()
//!     .common_name("Test CT Issuer".to_string())
//!     .serial_number(pki::rand_serial()?)
//!     .validity(Validity::starting_at(SystemClock.now(), time::Duration::days(365))?)
//!     .key_usage(KeyUsages::KeyCertSign | KeyUsages::CRLSign)
//!     .is_ca(true)
//!     .build();
//! let issuer_cert = Certificate::new_self_signed(&issuer_template, &issuer_key)?;
//!
//! let pair = issue_test_certificate("", &issuer_key, &issuer_cert, &SystemClock, None, None)?;
//! assert!(pair.pre_cert.has_ct_poison());
//! assert!(!pair.cert.has_ct_poison());
//! println!("{}", pair.pre_cert.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every failure is returned as a [`error::TestCertError`] and no partial pair
//! is ever produced:
//!
//! ```rust
//! use ct_testcert::{error::TestCertError, issuer::issue_certificate};
//!
//! match issue_certificate(None, None, None, None) {
//!     Err(TestCertError::MissingArgument(arg)) => println!("missing {}", arg),
//!     Err(e) => println!("Other error: {}", e),
//!     Ok(_) => unreachable!(),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`testcert`]: precertificate/certificate pair issuance
//! - [`issuer`]: signing a template into a certificate
//! - [`cert`]: parsed certificates, templates and extensions
//! - [`key`]: key pairs, public keys and key import
//! - [`pki`]: random serial numbers and keys
//! - [`clock`]: injectable time sources
//! - [`error`]: error types
//! - [`tbs_certificate`]: low-level to-be-signed structure assembly

pub mod cert;
pub mod clock;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod pki;
pub mod tbs_certificate;
pub mod testcert;
