use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};
use crate::models::{Lecture, UserSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub creator_id: String,
    /// Lecture IDs in course order
    pub lectures: Vec<String>,
    /// Users enrolled in this course (set semantics, populated from enrollments)
    pub enrolled_students: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Course with its creator and lectures expanded, as shown on the course page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseDetail {
    pub id: String,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub creator: UserSummary,
    pub lectures: Vec<Lecture>,
    pub enrolled_students: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourse {
    pub title: String,
    pub price: Decimal,
    pub creator_id: String,
}

impl CreateCourse {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest(msg::TITLE_EMPTY.into()));
        }
        if self.price.is_sign_negative() {
            return Err(AppError::BadRequest(msg::NEGATIVE_PRICE.into()));
        }
        Ok(())
    }
}
