pub mod config;
pub mod errors;
pub mod logging;
pub mod metrics;
pub mod response;
pub mod routes;
pub mod server;
pub mod startup;
pub mod state;

pub use config::GatewayConfig;
pub use errors::ApiError;
pub use server::{build_router, run_server};
pub use startup::initialize;
pub use state::AppState;
