pub mod config;
pub mod event;
pub mod records;
pub mod types;
pub mod validation;

pub use config::*;
pub use event::*;
pub use records::*;
pub use types::*;
pub use validation::*;
