// Field Validators - Reusable validation components
use std::net::IpAddr;

use once_cell::sync::Lazy;

/// Trait for field validators
pub trait FieldValidator<T: ?Sized> {
    /// Validate a field value
    fn validate(&self, value: &T) -> Result<(), String>;
}

/// IP address validator
#[derive(Debug, Clone)]
pub struct IpValidator {
    allow_v4: bool,
    allow_v6: bool,
}

impl Default for IpValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl IpValidator {
    /// Accept both address families
    pub fn new() -> Self {
        Self { allow_v4: true, allow_v6: true }
    }

    pub fn v4_only(mut self) -> Self {
        self.allow_v4 = true;
        self.allow_v6 = false;
        self
    }

    pub fn v6_only(mut self) -> Self {
        self.allow_v4 = false;
        self.allow_v6 = true;
        self
    }
}

impl FieldValidator<str> for IpValidator {
    fn validate(&self, value: &str) -> Result<(), String> {
        let ip: IpAddr = value.parse().map_err(|_| "Invalid IP address format".to_string())?;

        match ip {
            IpAddr::V4(_) if !self.allow_v4 => Err("IPv4 addresses are not allowed".to_string()),
            IpAddr::V6(_) if !self.allow_v6 => Err("IPv6 addresses are not allowed".to_string()),
            _ => Ok(()),
        }
    }
}

/// One DNS label: alphanumerics, hyphen and underscore, no leading or trailing hyphen.
static DOMAIN_LABEL_REGEX: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^[a-zA-Z0-9_](?:[a-zA-Z0-9_\-]{0,61}[a-zA-Z0-9_])?$")
        .expect("DOMAIN_LABEL_REGEX pattern is valid and well-formed")
});

/// Leading `*` followed by one or more dot-separated labels, e.g. `*.example.com`.
static DNS_WILDCARD_REGEX: Lazy<regex::Regex> = Lazy::new(|| {
    regex::Regex::new(r"^\*?(?:\.[a-zA-Z0-9\-]+)+$")
        .expect("DNS_WILDCARD_REGEX pattern is valid and well-formed")
});

const MAX_DOMAIN_LENGTH: usize = 253;
const MAX_DOMAIN_LABELS: usize = 127;

/// Internet domain name validator
///
/// A single trailing dot is tolerated. The final label may not start with a
/// digit, which keeps dotted-quad strings out.
#[derive(Debug, Clone, Default)]
pub struct DomainNameValidator;

impl DomainNameValidator {
    pub fn new() -> Self {
        Self
    }
}

impl FieldValidator<str> for DomainNameValidator {
    fn validate(&self, value: &str) -> Result<(), String> {
        let name = value.strip_suffix('.').unwrap_or(value);
        if name.is_empty() || name.len() > MAX_DOMAIN_LENGTH {
            return Err("Domain name length is out of range".to_string());
        }

        let labels: Vec<&str> = name.split('.').collect();
        if labels.len() > MAX_DOMAIN_LABELS {
            return Err("Domain name has too many labels".to_string());
        }
        if let Some(label) = labels.iter().find(|l| !DOMAIN_LABEL_REGEX.is_match(l)) {
            return Err(format!("Invalid domain label '{}'", label));
        }
        if labels.last().is_some_and(|l| l.starts_with(|c: char| c.is_ascii_digit())) {
            return Err("Top-level label must not start with a digit".to_string());
        }

        Ok(())
    }
}

/// DNS wildcard pattern validator (`*.example.com`)
#[derive(Debug, Clone, Default)]
pub struct WildcardDomainValidator;

impl WildcardDomainValidator {
    pub fn new() -> Self {
        Self
    }
}

impl FieldValidator<str> for WildcardDomainValidator {
    fn validate(&self, value: &str) -> Result<(), String> {
        if value.trim().is_empty() {
            return Err("DNS wildcard pattern is empty".to_string());
        }
        if DNS_WILDCARD_REGEX.is_match(value) {
            Ok(())
        } else {
            Err("Invalid DNS wildcard pattern".to_string())
        }
    }
}
