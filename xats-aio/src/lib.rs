// xats-aio/src/lib.rs
//! Asynchronous IO for xats (fragment loading, checksums, json)

pub mod checksum;
pub mod json_io;
pub mod loader;

pub use checksum::sha256_hex;
pub use json_io::read_json_async;
pub use loader::FsFragmentLoader;
