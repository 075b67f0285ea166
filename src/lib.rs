pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod forge;
pub mod git;
pub mod process;
pub mod recipe;
pub mod report;
pub mod result;
pub mod tracker;

pub use result::Result;
