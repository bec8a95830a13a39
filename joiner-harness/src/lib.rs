//! I/O around the join engine: relation files, query text and the stdin/stdout protocol.
pub mod dump;
pub mod loader;
pub mod parser;
pub mod protocol;
pub mod stats;
