pub mod receipt;

pub use receipt::{format_display_date, Receipt};
