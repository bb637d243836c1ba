//! Contact form validation and emergency-contact export.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MIN_MESSAGE_LENGTH: usize = 10;
pub const MAX_MESSAGE_LENGTH: usize = 500;
pub const MAX_TEXT_LENGTH: usize = 1000;

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| match Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$") {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!("Email pattern failed to compile: {}", e);
                None
            }
        })
        .as_ref()
}

/// A single rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Inputs are trimmed before checking.
pub fn validate_name(value: &str) -> Result<(), String> {
    if value.trim().chars().count() >= MIN_NAME_LENGTH {
        Ok(())
    } else {
        Err(format!("Name must be at least {} characters", MIN_NAME_LENGTH))
    }
}

pub fn validate_email(value: &str) -> Result<(), String> {
    if email_regex().is_some_and(|re| re.is_match(value.trim())) {
        Ok(())
    } else {
        Err("Invalid email address".to_string())
    }
}

pub fn validate_message(value: &str) -> Result<(), String> {
    let len = value.trim().chars().count();
    if len < MIN_MESSAGE_LENGTH {
        Err(format!("Message must be at least {} characters", MIN_MESSAGE_LENGTH))
    } else if len > MAX_MESSAGE_LENGTH {
        Err(format!("Message must not exceed {} characters", MAX_MESSAGE_LENGTH))
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Validate every field; all failures are returned, not just the first.
pub fn validate_contact_form(form: &ContactForm) -> Result<(), Vec<FieldError>> {
    let checks: [(&'static str, Result<(), String>); 3] = [
        ("name", validate_name(&form.name)),
        ("email", validate_email(&form.email)),
        ("message", validate_message(&form.message)),
    ];

    let errors: Vec<FieldError> = checks
        .into_iter()
        .filter_map(|(field, result)| result.err().map(|message| FieldError { field, message }))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Trim, drop angle brackets, cap at `MAX_TEXT_LENGTH` characters.
pub fn sanitize_text(input: &str) -> String {
    input
        .trim()
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .take(MAX_TEXT_LENGTH)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub relationship: String,
}

impl EmergencyContact {
    pub fn sanitized(&self) -> Self {
        Self {
            name: sanitize_text(&self.name),
            phone: sanitize_text(&self.phone),
            email: sanitize_text(&self.email),
            relationship: sanitize_text(&self.relationship),
        }
    }

    fn to_vcard(&self) -> String {
        format!(
            "BEGIN:VCARD\nVERSION:3.0\nFN:{}\nTEL:{}\nEMAIL:{}\nNOTE:Emergency Contact - {}\nEND:VCARD",
            single_line(&self.name),
            single_line(&self.phone),
            single_line(&self.email),
            single_line(&self.relationship)
        )
    }
}

/// A vCard property value must not start a new property line.
fn single_line(value: &str) -> String {
    value
        .split(['\r', '\n'])
        .filter(|part| !part.trim().is_empty())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

/// vCard 3.0 document, one card per contact, fields sanitized.
pub fn contacts_to_vcard(contacts: &[EmergencyContact]) -> String {
    contacts
        .iter()
        .map(|c| c.sanitized().to_vcard())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Al").is_ok());
        assert!(validate_name(" A ").is_err());
        assert_eq!(
            validate_name("").unwrap_err(),
            "Name must be at least 2 characters"
        );
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@example.com").is_ok());
        assert!(validate_email("  ana@example.com ").is_ok());
        assert!(validate_email("ana@example").is_err());
        assert!(validate_email("ana example@x.com").is_err());
        assert!(validate_email("@example.com").is_err());
    }

    #[test]
    fn test_validate_message_bounds() {
        assert!(validate_message("too short").is_err());
        assert!(validate_message("exactly 10").is_ok());
        assert!(validate_message(&"x".repeat(500)).is_ok());
        assert_eq!(
            validate_message(&"x".repeat(501)).unwrap_err(),
            "Message must not exceed 500 characters"
        );
    }

    #[test]
    fn test_validate_contact_form_collects_all_errors() {
        let form = ContactForm {
            name: "A".into(),
            email: "nope".into(),
            message: "hi".into(),
        };
        let errors = validate_contact_form(&form).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name", "email", "message"]);

        let form = ContactForm {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            message: "Checking in after the storm.".into(),
        };
        assert!(validate_contact_form(&form).is_ok());
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  <b>Ana</b>  "), "bAna/b");
        assert_eq!(sanitize_text(&"é".repeat(1200)).chars().count(), 1000);
    }

    #[test]
    fn test_contacts_to_vcard() {
        let contacts = vec![
            EmergencyContact {
                name: " Ana <Silva> ".into(),
                phone: "555-0100".into(),
                email: "ana@example.com".into(),
                relationship: "Sister".into(),
            },
            EmergencyContact {
                name: "Dr. Lee".into(),
                phone: "555-0199".into(),
                email: String::new(),
                relationship: "Physician".into(),
            },
        ];

        let vcard = contacts_to_vcard(&contacts);
        assert_eq!(vcard.matches("BEGIN:VCARD").count(), 2);
        assert!(vcard.starts_with("BEGIN:VCARD\nVERSION:3.0\nFN:Ana Silva\nTEL:555-0100\n"));
        assert!(vcard.contains("NOTE:Emergency Contact - Sister\nEND:VCARD\nBEGIN:VCARD"));
        assert!(vcard.ends_with("NOTE:Emergency Contact - Physician\nEND:VCARD"));
    }

    #[test]
    fn test_vcard_fields_cannot_inject_lines() {
        let contacts = vec![EmergencyContact {
            name: "Ana\r\nEND:VCARD\nBEGIN:VCARD\nFN:Mallory".into(),
            phone: "555-0100".into(),
            email: "ana@example.com".into(),
            relationship: "Sister\n".into(),
        }];

        let vcard = contacts_to_vcard(&contacts);
        assert_eq!(vcard.lines().filter(|l| l.starts_with("BEGIN:VCARD")).count(), 1);
        assert_eq!(vcard.lines().count(), 7);
        assert!(vcard.contains("\nFN:Ana END:VCARD BEGIN:VCARD FN:Mallory\n"));
        assert!(vcard.contains("\nNOTE:Emergency Contact - Sister\nEND:VCARD"));
        assert!(!vcard.contains('\r'));
    }

    #[test]
    fn test_contacts_to_vcard_empty() {
        assert_eq!(contacts_to_vcard(&[]), "");
    }
}
