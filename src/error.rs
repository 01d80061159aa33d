use thiserror::Error;
use vc_codegen::{CodegenError, ConversionError};

/// Failure of a [`Codec`](crate::Codec) entry point.
#[derive(Error, Debug)]
pub enum Error {
    /// The converter of the root type could not be compiled.
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    /// The value did not fit the compiled converter.
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    /// The text was not valid JSON, or the tree could not be written.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
