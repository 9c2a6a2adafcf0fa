use validator::{Validate, ValidateEmail};

pub fn validate<T: Validate>(val: &T) -> Result<(), validator::ValidationErrors> {
    val.validate()
}

/// `local@domain.tld`: the address must also carry a dot in its domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) || !email.to_string().validate_email() {
        return false;
    }
    match email.rsplit_once('@') {
        Some((_, domain)) => domain
            .split_once('.')
            .map(|(head, tail)| !head.is_empty() && !tail.is_empty())
            .unwrap_or(false),
        None => false,
    }
}
