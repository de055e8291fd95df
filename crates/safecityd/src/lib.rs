pub mod error;
pub mod model;
pub mod routes;
pub mod runtime;
pub mod server;
pub mod state;
pub mod telemetry;

pub use error::*;
pub use model::*;
pub use routes::*;
pub use runtime::*;
pub use server::*;
pub use state::*;
pub use telemetry::*;
