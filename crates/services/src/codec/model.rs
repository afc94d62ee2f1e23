use drivebucket_config::ModelFormat;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_pickle::{DeOptions, SerOptions};

use super::CodecError;

pub fn decode_model<M: DeserializeOwned>(format: ModelFormat, bytes: &[u8]) -> Result<M, CodecError> {
    match format {
        ModelFormat::Pickle => Ok(serde_pickle::from_slice(
            bytes,
            DeOptions::new().replace_unresolved_globals(),
        )?),
        ModelFormat::Json => Ok(serde_json::from_slice(bytes)?),
    }
}

pub fn encode_model<M: Serialize>(format: ModelFormat, model: &M) -> Result<Vec<u8>, CodecError> {
    match format {
        ModelFormat::Pickle => Ok(serde_pickle::to_vec(model, SerOptions::new())?),
        ModelFormat::Json => Ok(serde_json::to_vec(model)?),
    }
}
