//! Macro for implementing Display and FromStr for closed string enums
//!
//! Credential types, permission operations, key usages and audit codes are
//! all persisted or exchanged as lowercase strings. This macro keeps the
//! mapping in one place and parses case-insensitively.
//!
//! # Example
//!
//! ```rust
//! use credstore_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Mode {
//!     Overwrite,
//!     NoOverwrite,
//!     Converge,
//! }
//!
//! impl_domain_status_conversions!(Mode {
//!     Overwrite => "overwrite",
//!     NoOverwrite => "no-overwrite",
//!     Converge => "converge",
//! });
//!
//! assert_eq!("CONVERGE".parse::<Mode>().unwrap(), Mode::Converge);
//! ```

/// Implements Display and FromStr traits for string-backed enums
///
/// This macro generates:
/// - Display trait: converts enum variants to their lowercase strings
/// - FromStr trait: parses case-insensitive strings to enum variants
///
/// The error type of `FromStr` is a `String` naming the enum and the
/// rejected input.
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.to_lowercase().as_str() {
                    $($str => Ok(Self::$variant),)+
                    _ => Err(format!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Usage {
        DigitalSignature,
        KeyCertSign,
        CrlSign,
    }

    impl_domain_status_conversions!(Usage {
        DigitalSignature => "digital_signature",
        KeyCertSign => "key_cert_sign",
        CrlSign => "crl_sign",
    });

    #[test]
    fn display_uses_mapped_string() {
        assert_eq!(Usage::DigitalSignature.to_string(), "digital_signature");
        assert_eq!(Usage::KeyCertSign.to_string(), "key_cert_sign");
        assert_eq!(Usage::CrlSign.to_string(), "crl_sign");
    }

    #[test]
    fn fromstr_is_case_insensitive() {
        assert_eq!(Usage::from_str("crl_sign").unwrap(), Usage::CrlSign);
        assert_eq!(Usage::from_str("KEY_CERT_SIGN").unwrap(), Usage::KeyCertSign);
        assert_eq!(Usage::from_str("Digital_Signature").unwrap(), Usage::DigitalSignature);
    }

    #[test]
    fn fromstr_rejects_unknown_value() {
        let err = Usage::from_str("key_agreement").unwrap_err();
        assert!(err.contains("Usage"));
        assert!(err.contains("key_agreement"));
    }

    #[test]
    fn display_and_parse_agree() {
        for usage in [Usage::DigitalSignature, Usage::KeyCertSign, Usage::CrlSign] {
            assert_eq!(Usage::from_str(&usage.to_string()).unwrap(), usage);
        }
    }
}
