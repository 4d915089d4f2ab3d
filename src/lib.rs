pub mod ai;
pub mod browser;
pub mod cli;
pub mod crawl;
pub mod diagnose;
pub mod error;
pub mod extract;
pub mod output;
pub mod report;
pub mod runner;
pub mod testcase;
