pub mod common;
pub mod shorts;
pub mod ui;
