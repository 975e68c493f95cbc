//! HTTP surface of the service.

pub mod docs;
pub mod extract;
pub mod handler;
pub mod server;

pub use handler::AppState;
pub use server::SummaryServer;
