pub mod account_service;
pub mod attempt_service;
pub mod dashboard_service;
pub mod export_service;
pub mod grading_service;
pub mod import_service;
pub mod reconcile;
pub mod result_service;
pub mod spreadsheet;
pub mod subject_service;
pub mod test_service;
