pub mod csv_service;
pub mod history_provider;
pub mod scan_service;

pub use csv_service::*;
pub use history_provider::*;
pub use scan_service::*;
