pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod platform;
pub mod report;
pub mod scan;
pub mod store;
pub mod tag;
pub mod timeline;
pub mod tracker;
pub mod util;
