//! Credential helpers

mod password;

pub use password::{
    hash_password, validate_password_policy, validate_username, verify_password, PasswordService,
};
