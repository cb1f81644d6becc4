pub mod archive;
pub mod compression;
pub mod ghostscript;
pub mod page_range;
pub mod pdf_processor;

pub use archive::create_zip;
pub use compression::{
    CompressionParams, CompressionService, CompressionTarget, PdfCompressor, PdfPreset, QualityTier,
};
pub use ghostscript::GhostscriptCompressor;
pub use page_range::parse_page_range;
pub use pdf_processor::PdfProcessor;
