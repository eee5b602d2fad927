use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    pub id: String,
    pub course_id: String,
    pub title: String,
    /// Order within the course (0-based)
    pub position: i64,
    /// Viewable without purchasing the course
    pub is_preview_free: bool,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateLecture {
    pub title: String,
    #[serde(default)]
    pub is_preview_free: bool,
}
