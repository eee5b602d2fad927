use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};

/// Basic email sanity check: one `@`, non-empty local part, dotted domain.
/// Not RFC 5322 compliant on purpose.
fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::BadRequest(msg::EMAIL_EMPTY.into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    let (local_part, domain_part) = (parts[0], parts[1]);

    if local_part.is_empty() || local_part.contains(' ') {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    if domain_part.is_empty()
        || !domain_part.contains('.')
        || domain_part.starts_with('.')
        || domain_part.ends_with('.')
    {
        return Err(AppError::BadRequest(msg::INVALID_EMAIL_FORMAT.into()));
    }

    Ok(())
}

/// A platform user. Buyers and course creators are both users.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Courses this user is enrolled in (set semantics, populated from enrollments)
    pub enrolled_courses: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Public view of a user, embedded as a course's creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
}

impl CreateUser {
    pub fn validate(&self) -> Result<()> {
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest(msg::NAME_EMPTY.into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(email: &str) -> CreateUser {
        CreateUser {
            name: "Asha".to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn accepts_plain_email() {
        assert!(create("asha@example.com").validate().is_ok());
    }

    #[test]
    fn rejects_malformed_emails() {
        let malformed = [
            "",
            "asha",
            "a@b@c.com",
            "@example.com",
            "asha@example",
            "asha@.com",
            "as ha@example.com",
        ];
        for email in malformed {
            assert!(create(email).validate().is_err(), "{email:?} should be rejected");
        }
    }

    #[test]
    fn rejects_blank_name() {
        let input = CreateUser {
            name: "  ".to_string(),
            email: "asha@example.com".to_string(),
        };
        assert!(input.validate().is_err());
    }
}
