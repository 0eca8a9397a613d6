//! Field validation building blocks
//!
//! Validators implement [`FieldValidator`] and report failures as
//! human-readable strings; callers map them onto their own error codes.

mod validators;

pub use validators::{DomainNameValidator, FieldValidator, IpValidator, WildcardDomainValidator};

/// True when any of `validators` accepts `value`.
pub fn any_valid<T: ?Sized>(value: &T, validators: &[&dyn FieldValidator<T>]) -> bool {
    validators.iter().any(|v| v.validate(value).is_ok())
}
