//! Registration preconditions.

use std::time::Duration;

use crate::countries::is_supported_country;
use crate::error::SessionError;

/// Maximum username length accepted by the registration form.
pub const MAX_USERNAME_LEN: usize = 50;

/// Single delayed re-fetch after submitting a registration; there are no
/// further local retries.
pub const REGISTRATION_REFETCH_DELAY: Duration = Duration::from_secs(2);

/// Client-side view of the registration life cycle. "Registered" means the
/// contract reports a non-empty username for the address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Submitting,
    Registered,
}

/// Checks the form inputs locally; returns the trimmed username. No state
/// changes and no network traffic on rejection.
pub fn validate<'a>(username: &'a str, country: &str) -> Result<&'a str, SessionError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(SessionError::EmptyUsername);
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(SessionError::UsernameTooLong);
    }
    if !is_supported_country(country) {
        return Err(SessionError::UnknownCountry(country.to_string()));
    }
    Ok(username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_accepts_valid_input() {
        assert_eq!(validate("  alice  ", "France").unwrap(), "alice");
    }

    #[test]
    fn rejects_blank_username() {
        assert!(matches!(validate("   ", "France"), Err(SessionError::EmptyUsername)));
    }

    #[test]
    fn rejects_overlong_username() {
        let long = "x".repeat(MAX_USERNAME_LEN + 1);
        assert!(matches!(validate(&long, "France"), Err(SessionError::UsernameTooLong)));
        let max = "x".repeat(MAX_USERNAME_LEN);
        assert!(validate(&max, "France").is_ok());
    }

    #[test]
    fn rejects_unknown_country() {
        assert!(matches!(
            validate("alice", "Atlantis"),
            Err(SessionError::UnknownCountry(_))
        ));
    }
}
