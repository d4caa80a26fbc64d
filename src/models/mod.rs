pub mod account;
pub mod answer;
pub mod question;
pub mod subject;
pub mod test;
pub mod test_result;
