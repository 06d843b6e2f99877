pub mod connection_limit;

pub use connection_limit::{ConnectionPermit, connection_limit_middleware};
