//! Decrypted credential values
//!
//! These only exist for the duration of a request. `Debug` output never
//! contains secret material.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::credential::CredentialType;

/// Username and password pair. The password hash is derived on read.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserValue {
    pub username: Option<String>,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

/// Public/private keypair shared by `ssh` and `rsa` credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPairValue {
    pub public_key: String,
    pub private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_fingerprint: Option<String>,
}

/// Certificate, its issuing CA and private key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateValue {
    pub ca: Option<String>,
    pub certificate: String,
    pub private_key: String,
    pub ca_name: Option<String>,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CredentialValue {
    Password(String),
    Certificate(CertificateValue),
    Ssh(KeyPairValue),
    Rsa(KeyPairValue),
    Value(String),
    Json(Map<String, Value>),
    User(UserValue),
}

impl CredentialValue {
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::Password(_) => CredentialType::Password,
            Self::Certificate(_) => CredentialType::Certificate,
            Self::Ssh(_) => CredentialType::Ssh,
            Self::Rsa(_) => CredentialType::Rsa,
            Self::Value(_) => CredentialType::Value,
            Self::Json(_) => CredentialType::Json,
            Self::User(_) => CredentialType::User,
        }
    }
}

impl CredentialValue {
    /// Copy with the fields the store derives on read cleared.
    ///
    /// Two values are the same secret when their stripped forms are equal.
    #[must_use]
    pub fn without_derived(&self) -> Self {
        match self {
            Self::User(user) => Self::User(UserValue { password_hash: None, ..user.clone() }),
            Self::Ssh(pair) => {
                Self::Ssh(KeyPairValue { public_key_fingerprint: None, ..pair.clone() })
            }
            Self::Rsa(pair) => {
                Self::Rsa(KeyPairValue { public_key_fingerprint: None, ..pair.clone() })
            }
            other => other.clone(),
        }
    }
}

/// Decrypted version returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialView {
    pub uuid: Uuid,
    pub name: String,
    pub version_created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub value: CredentialValue,
}

impl CredentialView {
    pub fn credential_type(&self) -> CredentialType {
        self.value.credential_type()
    }
}

impl std::fmt::Debug for CredentialValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CredentialValue::{}([REDACTED])", self.credential_type())
    }
}

impl std::fmt::Debug for UserValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserValue")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for KeyPairValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPairValue")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for CertificateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateValue")
            .field("ca_name", &self.ca_name)
            .field("private_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_secrets() {
        let value = CredentialValue::Password("hunter2".into());
        let rendered = format!("{value:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("password"));

        let user = UserValue {
            username: Some("app".into()),
            password: "s3cr3t".into(),
            password_hash: None,
        };
        assert!(!format!("{user:?}").contains("s3cr3t"));
    }

    #[test]
    fn without_derived_ignores_hashes_and_fingerprints() {
        let stored = CredentialValue::User(UserValue {
            username: Some("app".into()),
            password: "pw".into(),
            password_hash: Some("abc".into()),
        });
        let requested = CredentialValue::User(UserValue {
            username: Some("app".into()),
            password: "pw".into(),
            password_hash: None,
        });
        assert_ne!(stored, requested);
        assert_eq!(stored.without_derived(), requested.without_derived());
    }

    #[test]
    fn json_value_serializes_with_type_tag() {
        let mut map = Map::new();
        map.insert("port".into(), Value::from(5432));
        let value = CredentialValue::Json(map);

        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["type"], "json");
        assert_eq!(json["value"]["port"], 5432);
    }
}
