//! Traits for binary IO of LSRPC wire containers.

#![forbid(unsafe_code)]

pub use cookie_factory::GenError;
pub use nom::IResult;

/// De-serialization from bytes.
pub trait FromBytes: Sized {
    /// De-serialize from bytes.
    fn from_bytes(input: &[u8]) -> IResult<&[u8], Self>;
}

/// Serialization into bytes.
pub trait ToBytes {
    /// Serialize into bytes starting from the given buffer position.
    fn to_bytes<'a>(&self, buf: (&'a mut [u8], usize)) -> Result<(&'a mut [u8], usize), GenError>;
}

/// Unconditionally fail serialization with the given error code. Intended
/// for use inside `gen_cond!` guards.
pub fn gen_error(_buf: (&mut [u8], usize), error: u32) -> Result<(&mut [u8], usize), GenError> {
    Err(GenError::CustomError(error))
}
