pub mod config;
pub mod dispatch;
pub mod error;
pub mod help;
pub mod matcher;
pub mod parse;
pub mod planner;
pub mod resolve;
pub mod signer;
pub mod spec_store;
pub mod transport;

pub use error::Error;
pub use parse::Specification;
pub use parse::operation::HttpMethod;
