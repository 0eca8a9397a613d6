//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! credential store.

// Key rotation
pub const ROTATION_BATCH_SIZE: usize = 50;

/// Known plaintext sealed inside every encryption key canary.
pub const CANARY_VALUE: &str =
    "credstore-key-canary:7c1f3e52a9d84b6e8f0a2d4c6b8e1f3a5c7e9b1d3f5a7c9e1b3d5f7a9c1e3b5d";

// Certificate parameters
pub const DEFAULT_KEY_LENGTH: u32 = 2048;
pub const VALID_KEY_LENGTHS: [u32; 3] = [2048, 3072, 4096];
pub const DEFAULT_DURATION_DAYS: u32 = 365;
pub const MIN_DURATION_DAYS: u32 = 1;
pub const MAX_DURATION_DAYS: u32 = 3650;

// Password / user generation
pub const DEFAULT_PASSWORD_LENGTH: usize = 30;
pub const MIN_PASSWORD_LENGTH: usize = 4;
pub const MAX_PASSWORD_LENGTH: usize = 200;
pub const GENERATED_USERNAME_LENGTH: usize = 20;
pub const USER_SALT_LENGTH: usize = 16;
pub const SPECIAL_CHARACTERS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

// Paths
pub const NAME_SEPARATOR: char = '/';
