pub mod source_file;

pub use source_file::{RawRow, SourceFile, SourceFormat};
