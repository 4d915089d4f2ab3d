pub mod extractor;
pub mod form_model;
pub mod page_signals;
pub mod selectors;
