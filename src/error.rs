//! use ct_testcert::error::TestCertError;

use std::fmt;

use thiserror::Error;

/// Names a required input of [`issue_certificate`](crate::issuer::issue_certificate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    SubjectKey,
    IssuerKey,
    IssuerCertificate,
    Template,
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Argument::SubjectKey => "subject key",
            Argument::IssuerKey => "issuer key",
            Argument::IssuerCertificate => "issuer certificate",
            Argument::Template => "template",
        };
        f.write_str(name)
    }
}

/// Represents errors that can occur while issuing test certificates.
///
/// Every error is returned to the caller as-is; nothing here is retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TestCertError {
    /// A required input was absent.
    #[error("cannot issue certificate with missing {0}")]
    MissingArgument(Argument),

    /// The base domain does not start with '.'.
    #[error("base domain must start with '.' to be used as a domain suffix, got {0:?}")]
    InvalidBaseDomain(String),

    /// The operating system entropy source failed.
    #[error("random source error: {0}")]
    RandomSourceError(String),

    /// Error while encoding a certificate structure.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error while producing a signature.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// Signed bytes could not be parsed back into a certificate.
    #[error("Failed to parse signed certificate: {0}")]
    ParseError(String),

    /// Error while decoding keys, certificates or extension values.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, TestCertError>;

impl From<der::Error> for TestCertError {
    fn from(err: der::Error) -> Self {
        TestCertError::EncodingError(err.to_string())
    }
}

impl From<pem::PemError> for TestCertError {
    fn from(err: pem::PemError) -> Self {
        TestCertError::DecodingError(err.to_string())
    }
}
