pub mod commands;
pub mod controller;
pub mod error;

pub use controller::ReceiptController;
pub use error::ReceiptError;
