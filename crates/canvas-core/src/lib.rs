pub mod artifact;
pub mod comments;
pub mod errors;
pub mod identity;
pub mod ids;
pub mod messages;
pub mod persistence;
pub mod range;
pub mod stream;
pub mod transport;
