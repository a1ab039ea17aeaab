use memorial_types::api::{CreateMemoryRequest, UpdateMemoryRequest};

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_MESSAGE_LEN: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Validation {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks a public submission. Every rule runs; errors accumulate in order.
pub fn validate_memory(candidate: &CreateMemoryRequest) -> Validation {
    let mut errors = Vec::new();

    check_required(
        candidate.from.as_deref(),
        MAX_NAME_LEN,
        ["Name is required", "Name cannot be empty", "Name must be less than 100 characters"],
        &mut errors,
    );
    check_required(
        candidate.message.as_deref(),
        MAX_MESSAGE_LEN,
        [
            "Message is required",
            "Message cannot be empty",
            "Message must be less than 10,000 characters",
        ],
        &mut errors,
    );

    Validation::from_errors(errors)
}

/// Checks an admin edit. Blank fields count as "not supplied" and keep the
/// stored value, so only the length limits apply.
pub fn validate_memory_update(update: &UpdateMemoryRequest) -> Validation {
    let mut errors = Vec::new();

    if let Some(from) = supplied(update.from.as_deref()) {
        if from.chars().count() > MAX_NAME_LEN {
            errors.push("Name must be less than 100 characters".to_string());
        }
    }
    if let Some(message) = supplied(update.message.as_deref()) {
        if message.chars().count() > MAX_MESSAGE_LEN {
            errors.push("Message must be less than 10,000 characters".to_string());
        }
    }

    Validation::from_errors(errors)
}

/// Trimmed value, or `None` if missing or blank.
pub fn supplied(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn check_required(value: Option<&str>, max: usize, messages: [&str; 3], errors: &mut Vec<String>) {
    let [missing, blank, too_long] = messages;
    match value {
        None | Some("") => errors.push(missing.to_string()),
        Some(v) if v.trim().is_empty() => errors.push(blank.to_string()),
        Some(v) if v.chars().count() > max => errors.push(too_long.to_string()),
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(from: Option<&str>, message: Option<&str>) -> CreateMemoryRequest {
        CreateMemoryRequest {
            from: from.map(String::from),
            message: message.map(String::from),
        }
    }

    #[test]
    fn accepts_valid_submission() {
        let v = validate_memory(&candidate(Some("Alice"), Some("Hi")));
        assert!(v.valid);
        assert!(v.errors.is_empty());
    }

    #[test]
    fn name_length_boundary() {
        let ok = "a".repeat(100);
        let long = "a".repeat(101);
        assert!(validate_memory(&candidate(Some(&ok), Some("Hi"))).valid);

        let v = validate_memory(&candidate(Some(&long), Some("Hi")));
        assert!(!v.valid);
        assert_eq!(v.errors, vec!["Name must be less than 100 characters"]);
    }

    #[test]
    fn message_length_boundary() {
        let ok = "m".repeat(10_000);
        let long = "m".repeat(10_001);
        assert!(validate_memory(&candidate(Some("Alice"), Some(&ok))).valid);

        let v = validate_memory(&candidate(Some("Alice"), Some(&long)));
        assert_eq!(v.errors, vec!["Message must be less than 10,000 characters"]);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let name = "é".repeat(100);
        assert!(validate_memory(&candidate(Some(&name), Some("Hi"))).valid);
    }

    #[test]
    fn errors_accumulate() {
        let v = validate_memory(&candidate(None, Some("   ")));
        assert!(!v.valid);
        assert_eq!(v.errors, vec!["Name is required", "Message cannot be empty"]);
    }

    #[test]
    fn update_ignores_blank_fields() {
        let update = UpdateMemoryRequest {
            from: Some("  ".into()),
            message: None,
        };
        assert!(validate_memory_update(&update).valid);

        let update = UpdateMemoryRequest {
            from: Some("a".repeat(101)),
            message: None,
        };
        assert!(!validate_memory_update(&update).valid);
    }
}
