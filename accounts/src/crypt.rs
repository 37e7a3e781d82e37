//! SHA-512 crypt (`$6$`) password hashes for the shadow database.

use crate::error::{AccountsError, AccountsResult};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha_crypt::{sha512_check, sha512_crypt_b64, Sha512Params};

const SALT_LENGTH: usize = 8;
const ROUNDS: usize = 5_000;

pub fn hash_password(password: &str) -> AccountsResult<String> {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect();

    hash_password_with_salt(password, &salt)
}

/// Hash with a caller supplied salt. The default round count is left out of
/// the output, matching glibc's `crypt(3)`.
pub fn hash_password_with_salt(password: &str, salt: &str) -> AccountsResult<String> {
    let params = Sha512Params::new(ROUNDS).map_err(|e| AccountsError::PasswordHash {
        message: format!("{:?}", e),
    })?;

    let hash = sha512_crypt_b64(password.as_bytes(), salt.as_bytes(), &params).map_err(|e| {
        AccountsError::PasswordHash {
            message: format!("{:?}", e),
        }
    })?;

    Ok(format!("$6${}${}", salt, hash))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    sha512_check(password, hash).is_ok()
}
