use argon2::{
    password_hash::{self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::error;

fn argon_failure(what: &'static str) -> impl FnOnce(password_hash::Error) -> anyhow::Error {
    move |e| {
        error!(error = %e, "argon2 {what} error");
        anyhow::anyhow!("{what}: {e}")
    }
}

/// Salted Argon2id digest in PHC string form.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(argon_failure("hash"))?;
    Ok(hash.to_string())
}

pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(argon_failure("parse"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Do the work of a verification without a stored digest, so a login for an
/// unknown account takes about as long as one with a wrong password.
pub fn burn_verification(plain: &str) {
    let _ = hash_password(plain);
}
