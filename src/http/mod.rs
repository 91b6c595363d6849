//! Raw HTTP handling: the hand-written request parser and the minimal
//! response builder shared by every service.

pub mod request;
pub mod response;

pub use request::{extract_query, parse, ParseError, ParsedRequest};
pub use request::{MAX_HEADER_BLOCK, MAX_REQUEST_SIZE};
