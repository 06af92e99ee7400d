use crate::validation::*;

/// Validate a video description: at most 255 characters, printable ASCII
/// plus common punctuation and whitespace only.
pub fn validate_description(description: &str) -> Result<(), String> {
    let validators: Vec<ValidatorFn> = vec![
        limit_length(255),
        allow_only_alphanumerics_and_specials(Some(" .,!?'\"-_:;()/&")),
    ];
    run_validators(description, &validators)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_description() {
        assert!(validate_description("Beach day, summer '24!").is_ok());
    }

    #[test]
    fn too_long() {
        let desc = "a".repeat(256);
        let err = validate_description(&desc).unwrap_err();
        assert!(err.contains("Length limit exceeded"));
    }

    #[test]
    fn rejects_disallowed_characters() {
        let err = validate_description("clip <script>").unwrap_err();
        assert!(err.contains("Invalid character"));
    }

    #[test]
    fn empty_description_is_allowed() {
        assert!(validate_description("").is_ok());
    }
}
