use serde::Serialize;

use crate::models::{subject::Subject, test::Test, test_result::ResultListing};

#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    pub total_users: i64,
    pub total_tests: i64,
    pub total_subjects: i64,
    pub total_results: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeacherDashboard {
    pub tests: Vec<Test>,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDashboard {
    pub available_tests: Vec<Test>,
    pub results: Vec<ResultListing>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "role")]
pub enum Dashboard {
    Admin(AdminDashboard),
    Teacher(TeacherDashboard),
    Student(StudentDashboard),
}
