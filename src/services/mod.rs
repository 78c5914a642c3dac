pub mod document;
pub mod registry;

pub use document::DocumentService;
pub use registry::DocumentRegistry;
