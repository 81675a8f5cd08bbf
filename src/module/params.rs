//! Runtime parameter decoding.
//!
//! Parameter buffers arrive already de-framed. Each module decodes them
//! into its own `*Parameters` record with postcard; the target record is
//! only overwritten once the whole buffer decoded cleanly.

use log::warn;
use serde::de::DeserializeOwned;

use crate::error::ParameterError;

/// Decode `bytes` into `target`, all or nothing.
///
/// Fails with [`ParameterError::Malformed`] when the buffer is short or a
/// field does not decode, and with [`ParameterError::TrailingBytes`] when
/// the record decoded but bytes were left over. `target` is untouched on
/// failure.
pub fn decode_into<T: DeserializeOwned>(
    bytes: &[u8],
    target: &mut T,
) -> Result<(), ParameterError> {
    let (decoded, rest) = postcard::take_from_bytes::<T>(bytes).map_err(|e| {
        warn!("parameter decode failed: {e}");
        ParameterError::Malformed
    })?;
    if !rest.is_empty() {
        warn!("parameter decode left {} trailing bytes", rest.len());
        return Err(ParameterError::TrailingBytes(rest.len()));
    }
    *target = decoded;
    Ok(())
}
