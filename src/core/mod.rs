pub mod backend;
pub mod decode;
pub mod error;
pub mod extract;
#[cfg(feature = "libesedb")]
pub mod libesedb;
pub mod mock;
pub mod report;
pub mod session;
pub mod timefmt;
