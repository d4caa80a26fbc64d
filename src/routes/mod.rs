pub mod accounts;
pub mod attempts;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod imports;
pub mod results;
pub mod subjects;
pub mod tests;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::{middleware::auth::require_bearer_auth, AppState};

/// Every route of the service. `/health`, `/ready` and login are open; the
/// rest require a bearer token and check roles inside the services.
pub fn build_router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/api/auth/login", post(auth::login));

    let protected_api = Router::new()
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/dashboard", get(dashboard::dashboard))
        .route("/api/admin/dashboard", get(dashboard::admin_dashboard))
        .route("/api/teacher/dashboard", get(dashboard::teacher_dashboard))
        .route("/api/student/dashboard", get(dashboard::student_dashboard))
        .route(
            "/api/admin/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route("/api/admin/accounts/:id", delete(accounts::delete_account))
        .route("/api/admin/students/import", post(imports::import_students))
        .route(
            "/api/admin/students/import/sample",
            get(imports::student_import_sample),
        )
        .route(
            "/api/subjects",
            get(subjects::list_subjects).post(subjects::create_subject),
        )
        .route("/api/subjects/:id", delete(subjects::delete_subject))
        .route("/api/tests", get(tests::list_tests).post(tests::create_test))
        .route("/api/tests/import", post(imports::import_test))
        .route("/api/tests/import/sample", get(imports::test_import_sample))
        .route(
            "/api/tests/:id",
            get(tests::get_test)
                .put(tests::update_test)
                .delete(tests::delete_test),
        )
        .route(
            "/api/student/tests/:id/start",
            post(attempts::start_attempt),
        )
        .route(
            "/api/student/tests/:id/submit",
            post(attempts::submit_attempt),
        )
        .route("/api/results", get(results::list_results))
        .route("/api/results/export", get(results::export_results))
        .route("/api/results/:id", delete(results::delete_result))
        .route("/api/results/:id/retake", post(results::initiate_retake))
        .layer(axum::middleware::from_fn(require_bearer_auth));

    public_api.merge(protected_api).with_state(state)
}
