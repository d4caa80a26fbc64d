pub mod account_dto;
pub mod attempt_dto;
pub mod auth_dto;
pub mod authoring_dto;
pub mod dashboard_dto;
pub mod results_dto;
