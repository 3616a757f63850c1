//! Wire protocols spoken by the server: a length-prefixed binary framing and
//! a minimal GET-only HTTP surface, auto-detected per connection.

mod binary;
mod error;
mod http;
pub mod io;
mod sniff;

pub use binary::{read_request, read_response, write_query, write_response};
pub use error::ProtocolError;
pub use http::{format_results_body, parse_request, read_head, write_response as write_http_response, HttpRequest, HttpStatus};
pub use sniff::{sniff, Protocol};
