pub mod catalog;
pub mod dictionary;
pub mod model;

pub use catalog::Catalog;
pub use dictionary::Dictionary;
pub use model::{Fingerprint, FpCode, MatchKind, OsFingerprint, VulnerabilityFingerprint};
