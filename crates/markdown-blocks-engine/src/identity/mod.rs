//! Block identity: content fingerprints and ID assignment.

pub mod assigner;
pub mod fingerprint;

pub use assigner::IdAssigner;
pub use fingerprint::{FINGERPRINT_VERSION, Fingerprint, Position, djb2, normalize_content};
