pub mod config;
pub mod reset;
pub mod run;
