pub mod page;
pub mod reader;

pub use page::{Document, Page, PageRange, PageSelection};
pub use reader::{DocumentFormat, FileReader};

use sha2::{Digest, Sha256};

/// Generate a stable document ID from its source name
pub fn generate_doc_id(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}
