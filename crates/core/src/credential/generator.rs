//! Value generation for generable credential types

use async_trait::async_trait;
use credstore_domain::constants::{GENERATED_USERNAME_LENGTH, SPECIAL_CHARACTERS, USER_SALT_LENGTH};
use credstore_domain::{KeyPairParameters, KeyPairValue, Result, StringGenerationParameters};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::Rng;

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &str = "0123456789";

/// RSA and SSH key pair generation. Byte-level key encoding lives outside
/// the core.
#[async_trait]
pub trait KeyPairGenerator: Send + Sync {
    /// PEM encoded RSA key pair.
    async fn generate_rsa(&self, parameters: &KeyPairParameters) -> Result<KeyPairValue>;

    /// OpenSSH public key with a PEM private key.
    async fn generate_ssh(&self, parameters: &KeyPairParameters) -> Result<KeyPairValue>;
}

/// Random password and username generation.
#[derive(Debug, Default, Clone, Copy)]
pub struct PasswordGenerator;

impl PasswordGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Password of `parameters.length` characters containing at least one
    /// character from every enabled character set.
    pub fn generate(&self, parameters: &StringGenerationParameters) -> Result<String> {
        parameters.validate()?;

        let mut sets: Vec<&[u8]> = Vec::with_capacity(4);
        if !parameters.exclude_lower {
            sets.push(LOWER.as_bytes());
        }
        if !parameters.exclude_upper {
            sets.push(UPPER.as_bytes());
        }
        if !parameters.exclude_number {
            sets.push(DIGITS.as_bytes());
        }
        if parameters.include_special {
            sets.push(SPECIAL_CHARACTERS.as_bytes());
        }

        let mut rng = OsRng;
        let alphabet: Vec<u8> = sets.concat();
        let mut chars: Vec<u8> = sets.iter().map(|set| pick(set, &mut rng)).collect();
        while chars.len() < parameters.length {
            chars.push(pick(&alphabet, &mut rng));
        }
        chars.shuffle(&mut rng);

        Ok(chars.into_iter().map(char::from).collect())
    }

    /// Letters-only username.
    pub fn generate_username(&self) -> String {
        let letters = [LOWER.as_bytes(), UPPER.as_bytes()].concat();
        let mut rng = OsRng;
        (0..GENERATED_USERNAME_LENGTH).map(|_| char::from(pick(&letters, &mut rng))).collect()
    }

    /// Alphanumeric salt for user password hashes.
    pub fn generate_salt(&self) -> String {
        let alphabet = [LOWER.as_bytes(), UPPER.as_bytes(), DIGITS.as_bytes()].concat();
        let mut rng = OsRng;
        (0..USER_SALT_LENGTH).map(|_| char::from(pick(&alphabet, &mut rng))).collect()
    }
}

fn pick(set: &[u8], rng: &mut impl Rng) -> u8 {
    set[rng.gen_range(0..set.len())]
}

#[cfg(test)]
mod tests {
    use credstore_domain::codes;

    use super::*;

    #[test]
    fn honours_length_and_exclusions() {
        let params = StringGenerationParameters {
            length: 40,
            exclude_upper: true,
            exclude_number: true,
            ..Default::default()
        };
        let password = PasswordGenerator::new().generate(&params).unwrap();

        assert_eq!(password.len(), 40);
        assert!(password.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn includes_every_enabled_set() {
        let params =
            StringGenerationParameters { length: 4, include_special: true, ..Default::default() };
        for _ in 0..20 {
            let password = PasswordGenerator::new().generate(&params).unwrap();
            assert!(password.chars().any(|c| c.is_ascii_lowercase()));
            assert!(password.chars().any(|c| c.is_ascii_uppercase()));
            assert!(password.chars().any(|c| c.is_ascii_digit()));
            assert!(password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)));
        }
    }

    #[test]
    fn rejects_invalid_parameters() {
        let params = StringGenerationParameters { length: 2, ..Default::default() };
        let err = PasswordGenerator::new().generate(&params).unwrap_err();
        assert_eq!(err.reason_code(), codes::INVALID_PASSWORD_LENGTH);
    }

    #[test]
    fn usernames_and_salts_have_fixed_shape() {
        let generator = PasswordGenerator::new();
        let username = generator.generate_username();
        assert_eq!(username.len(), GENERATED_USERNAME_LENGTH);
        assert!(username.chars().all(|c| c.is_ascii_alphabetic()));
        assert_eq!(generator.generate_salt().len(), USER_SALT_LENGTH);
    }
}
