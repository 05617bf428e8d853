pub mod health;
pub use self::health::health;

pub mod signup;
pub use self::signup::signup;

pub mod signin;
pub use self::signin::signin;

pub mod profile;
pub use self::profile::profile;

// request validation shared by the handlers
use regex::Regex;

const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_SPECIALS: &str = "!@#$%^&*(),.?\":{}|<>";

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email.trim()))
}

/// Sign-up password policy. Returns the first rule the password breaks.
pub fn password_policy(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err("Password must be at least 8 characters long.");
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic()) {
        return Err("Password must contain at least one letter.");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number.");
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return Err("Password must contain at least one special character.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("a@x.com"));
        assert!(valid_email(" Ann@Example.org "));
        assert!(!valid_email("a@x"));
        assert!(!valid_email("ax.com"));
        assert!(!valid_email("a b@x.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_password_policy() {
        assert!(password_policy("Passw0rd!").is_ok());
        assert_eq!(
            password_policy("Pa0!"),
            Err("Password must be at least 8 characters long.")
        );
        assert_eq!(
            password_policy("12345678!"),
            Err("Password must contain at least one letter.")
        );
        assert_eq!(
            password_policy("Password!"),
            Err("Password must contain at least one number.")
        );
        assert_eq!(
            password_policy("Passw0rd"),
            Err("Password must contain at least one special character.")
        );
    }
}
