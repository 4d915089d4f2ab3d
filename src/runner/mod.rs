pub mod hardener;
pub mod script_runner;
