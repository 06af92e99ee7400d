//! Small composable string validators, run in sequence against a single
//! input. Each validator reports the first rule it breaks; `run_validators`
//! stops at the first failure.

pub mod description;
pub mod naming;
pub mod upload;

pub type ValidatorFn = Box<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

pub fn force_lowercase() -> impl Fn(&str) -> String {
    |s: &str| s.to_lowercase()
}

pub fn limit_length(max: usize) -> ValidatorFn {
    Box::new(move |s: &str| {
        if s.chars().count() > max {
            Err(format!("Length limit exceeded: max {max} characters"))
        } else {
            Ok(())
        }
    })
}

pub fn limit_min_length(min: usize) -> ValidatorFn {
    Box::new(move |s: &str| {
        if s.chars().count() < min {
            Err(format!("too short: minimum {min} characters"))
        } else {
            Ok(())
        }
    })
}

pub fn allow_only_alphanumerics_and_specials(extra: Option<&str>) -> ValidatorFn {
    let extra = extra.unwrap_or("").to_string();
    Box::new(move |s: &str| {
        if s.chars().all(|c| c.is_ascii_alphanumeric() || extra.contains(c)) {
            Ok(())
        } else {
            Err("Invalid character: only alphanumerics and the allowed specials are permitted".to_string())
        }
    })
}

pub fn not_start_with_digit() -> ValidatorFn {
    Box::new(|s: &str| {
        if s.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            Err("value cannot start with a digit".to_string())
        } else {
            Ok(())
        }
    })
}

pub fn not_start_with_char(c: char) -> ValidatorFn {
    Box::new(move |s: &str| {
        if s.starts_with(c) {
            Err(format!("value cannot start with '{c}'"))
        } else {
            Ok(())
        }
    })
}

pub fn run_validators(s: &str, validators: &[ValidatorFn]) -> Result<(), String> {
    for validator in validators {
        validator(s)?;
    }
    Ok(())
}
