pub mod commit;
pub mod completions;
pub mod config;
pub mod habit;
pub mod public;
