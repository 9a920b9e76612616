//! `/ws/payment` connections, the registry they live in, and callback fan-out.

pub mod connection;
pub mod fanout;
pub mod handler;
pub mod registry;
