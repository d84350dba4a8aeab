//! Types shared by the ideaforge crates: idea submissions, report rows,
//! and the typed view of the analysis blob returned by the model.

pub mod analysis;
pub mod id;
pub mod types;
