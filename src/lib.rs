pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    account_service::AccountService, attempt_service::AttemptService,
    dashboard_service::DashboardService, import_service::ImportService,
    result_service::ResultService, subject_service::SubjectService, test_service::TestService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub account_service: AccountService,
    pub subject_service: SubjectService,
    pub test_service: TestService,
    pub attempt_service: AttemptService,
    pub result_service: ResultService,
    pub import_service: ImportService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self {
            account_service: AccountService::new(pool.clone()),
            subject_service: SubjectService::new(pool.clone()),
            test_service: TestService::new(pool.clone()),
            attempt_service: AttemptService::new(pool.clone()),
            result_service: ResultService::new(pool.clone()),
            import_service: ImportService::new(pool.clone()),
            dashboard_service: DashboardService::new(pool.clone()),
            pool,
        }
    }
}
