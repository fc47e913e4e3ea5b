pub mod epub_processor;
pub mod storage;

pub use epub_processor::*;
pub use storage::*;
