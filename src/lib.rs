pub mod client;
pub mod config;
pub mod deadline;
pub mod error;
pub mod proposal;
pub mod routes;
pub mod state;
pub mod upstream;
