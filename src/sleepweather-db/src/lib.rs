#[macro_use]
extern crate log;

mod document;
pub use document::{Document, Record, read_document, write_document};

mod remote;
pub use remote::{FirebaseClient, UploadReport};
