use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

/// Argon2 PHC string for a new account password.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("hash password: {e}"))
}

/// A stored value that is not a PHC string is an error, not a mismatch.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored password hash is malformed");
        anyhow::anyhow!("parse stored password hash: {e}")
    })?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("verify password: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_hash_gets_its_own_salt() {
        let first = hash_password("chef-of-the-day").unwrap();
        let second = hash_password("chef-of-the-day").unwrap();
        assert_ne!(first, second);
        assert!(verify_password("chef-of-the-day", &first).unwrap());
        assert!(verify_password("chef-of-the-day", &second).unwrap());
    }

    #[test]
    fn wrong_password_is_a_mismatch() {
        let hash = hash_password("idli-sambar").unwrap();
        assert!(!verify_password("dosa", &hash).unwrap());
    }

    #[test]
    fn plaintext_in_the_hash_column_is_an_error() {
        assert!(verify_password("idli-sambar", "idli-sambar").is_err());
    }
}
