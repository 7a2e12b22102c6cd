pub mod diff;
pub mod import;
