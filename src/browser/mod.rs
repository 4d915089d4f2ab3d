pub mod driver;
pub mod loader;
pub mod popup;
pub mod session;
