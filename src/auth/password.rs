use crate::auth::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Lowest work factor bcrypt accepts. Tests hash at this cost.
pub const MIN_COST: u32 = 4;

/// Cost used for the password fingerprint embedded in reset tokens. The
/// input is already a bcrypt hash, so the cheapest cost is enough.
const FINGERPRINT_COST: u32 = MIN_COST;

pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Constant-time via bcrypt. Malformed hashes never verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Reject passwords that are too short or contain the account email.
pub fn validate_password(password: &str, email: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password should be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    let email = email.trim().to_lowercase();
    if !email.is_empty() && password.to_lowercase().contains(&email) {
        return Err("Password should not contain e-mail".to_string());
    }
    Ok(())
}

/// Opaque marker of the current password hash. Changes whenever the
/// password does, which retires outstanding reset tokens.
pub fn fingerprint(hashed_password: &str) -> Result<String, AuthError> {
    Ok(bcrypt::hash(hashed_password, FINGERPRINT_COST)?)
}

pub fn fingerprint_matches(hashed_password: &str, fingerprint: &str) -> bool {
    bcrypt::verify(hashed_password, fingerprint).unwrap_or(false)
}
