mod model;
mod table;

pub use model::{decode_model, encode_model};
pub use table::{CsvTableCodec, Table, TableCodec};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Pickle error: {0}")]
    Pickle(#[from] serde_pickle::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("Row has {found} cells, expected {expected}")]
    Shape { expected: usize, found: usize },
}
