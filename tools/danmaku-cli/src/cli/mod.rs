pub mod check;
pub mod config;
pub mod diag;
pub mod run;
