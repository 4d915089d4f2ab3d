pub mod console;
pub mod csv;
pub mod layout;
pub mod markdown;
pub mod pytest;
pub mod writer;
