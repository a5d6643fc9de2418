pub mod display;
pub mod templates;
