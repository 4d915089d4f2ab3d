pub mod driver;
pub mod utils;
