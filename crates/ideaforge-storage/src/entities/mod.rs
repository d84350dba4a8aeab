pub mod report;
pub mod user;
