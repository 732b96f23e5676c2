//! Message intake: raw messages, mail sources and content decoding.

pub mod decoder;
pub mod html;
pub mod message;
pub mod source;

pub use decoder::{ContentDecoder, DecodeWarning, DecodedContent};
pub use message::{RawBody, RawMessage, TransferEncoding};
pub use source::{EmlDirectorySource, JsonBatchSource, MailSource};
