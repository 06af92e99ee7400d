use crate::validation::*;

/// Validate and normalize a username: lowercased, 2-63 chars, alphanumerics
/// and `_` only, cannot start with a digit.
pub fn validate_username(username: &str) -> Result<String, String> {
    let lowercased = force_lowercase()(username);
    let validators: Vec<ValidatorFn> = vec![
        limit_length(63),
        limit_min_length(2),
        allow_only_alphanumerics_and_specials(Some("_")),
        not_start_with_digit(),
    ];
    run_validators(&lowercased, &validators)?;
    Ok(lowercased)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_username() {
        let r = validate_username("johN_doe99").unwrap();
        assert_eq!(r, "john_doe99");
    }

    #[test]
    fn too_long() {
        let name = "abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyzabcdefghijkl";
        let err = validate_username(name).unwrap_err();
        assert!(err.contains("Length limit exceeded"));
    }

    #[test]
    fn invalid_characters() {
        let err = validate_username("john*doe").unwrap_err();
        assert!(err.contains("Invalid character"));
    }

    #[test]
    fn starts_with_digit() {
        let err = validate_username("1abc").unwrap_err();
        assert!(err.contains("cannot start with a digit"));
    }

    #[test]
    fn case_conversion_happens_first() {
        let r = validate_username("abcXYZ").unwrap();
        assert_eq!(r, "abcxyz");
    }
}
