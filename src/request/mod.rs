pub mod requester;

pub use requester::{ProbeResult, Requester, RequesterConfig, RequesterError};
