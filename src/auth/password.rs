use bcrypt::BcryptError;

/// Rules applied to new passwords, plus the bcrypt work factor used to store them
#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
    pub hash_cost: u32,
}

impl PasswordPolicy {
    pub fn new(min_length: usize, hash_cost: u32) -> Self {
        Self { min_length, hash_cost }
    }
}

/// bcrypt hash (`$2b$<cost>$...`) carrying its own salt
pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    bcrypt::hash(password, cost)
}

/// A stored value that is not a bcrypt hash never verifies
pub fn verify_password(password: &str, stored: &str) -> bool {
    match bcrypt::verify(password, stored) {
        Ok(matched) => matched,
        Err(e) => {
            tracing::warn!("Unreadable password hash: {}", e);
            false
        }
    }
}

/// Every policy violation, empty when the password is acceptable
pub fn validate_password(policy: &PasswordPolicy, password: &str, username: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if password.chars().count() < policy.min_length {
        errors.push(format!(
            "This password is too short. It must contain at least {} characters.",
            policy.min_length
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        errors.push("This password is entirely numeric.".to_string());
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        errors.push("The password is too similar to the username.".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn hash_verifies_and_is_salted() {
        let a = hash_password("correct horse", TEST_COST).unwrap();
        let b = hash_password("correct horse", TEST_COST).unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$2b$04$"));
        assert!(verify_password("correct horse", &a));
        assert!(verify_password("correct horse", &b));
        assert!(!verify_password("battery staple", &a));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "md5$salt$abc"));
        assert!(!verify_password("x", "sha256$0123456789abcdef$2d711642b726b04401627ca9fbac32f5c8530fb1903cc4db02258717921a4881"));
    }

    #[test]
    fn cost_outside_bcrypt_range_is_an_error() {
        assert!(hash_password("pw", 3).is_err());
        assert!(hash_password("pw", 32).is_err());
    }

    #[test]
    fn policy_reports_every_problem() {
        let policy = PasswordPolicy::new(8, TEST_COST);
        assert!(validate_password(&policy, "s3cure-enough", "ada").is_empty());
        assert_eq!(validate_password(&policy, "1234", "ada").len(), 2);
        assert_eq!(validate_password(&policy, "adalovelace", "AdaLovelace").len(), 1);
    }
}
