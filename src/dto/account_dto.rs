use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::account::Role;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAccountPayload {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(length(min = 6))]
    pub password: String,
    pub role: Role,
    pub external_id: Option<String>,
    pub full_name: Option<String>,
    pub student_group: Option<String>,
    pub course: Option<String>,
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudentImportSummary {
    pub created: usize,
    pub skipped: usize,
    pub warnings: Vec<String>,
}
