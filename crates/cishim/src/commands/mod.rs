pub mod env;
pub mod ports;
pub mod reports;
pub mod routes;
pub mod serve;
