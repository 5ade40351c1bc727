// Connection module
// Negotiates which device link to use for the session: reuse, dial, or USB bootstrap.

pub mod negotiator;
pub mod types;


pub use negotiator::Negotiator;
pub use types::{
    ConnectRequest, ConnectionOutcome, ConnectionState, DEFAULT_PORT, RetryPolicy, Timing,
};
