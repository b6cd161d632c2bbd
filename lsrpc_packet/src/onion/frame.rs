/*! Layer frame: the length-prefixed container every onion layer carries.
*/

use nom::combinator::{rest, verify};
use nom::multi::length_data;
use nom::number::complete::le_u32;
use thiserror::Error;

use lsrpc_binary_io::*;

/// Frames declaring an inner blob larger than this are rejected when
/// decoding.
pub const MAX_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Error that can happen when decoding a layer frame.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum FrameError {
    /// Input ends before the declared inner size.
    #[error("Frame of {got} bytes ends before the declared {need} bytes")]
    Truncated {
        /// Bytes the frame header promised.
        need: usize,
        /// Bytes actually available.
        got: usize,
    },
    /// Declared inner size exceeds the decode limit.
    #[error("Declared inner size of {0} bytes exceeds the decode limit")]
    TooLarge(usize),
    /// Metadata tail is not a valid routing record.
    #[error("Metadata tail is not a valid routing record")]
    BadMeta,
}

/** Container embedded in every onion layer, and the plaintext a hop sees
after decrypting one.

Serialized form:

Length   | Content
-------- | ------
`4`      | Size of the inner blob (LE)
variable | Inner blob
variable | Routing JSON tail

*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Frame {
    /// Inner blob: the next layer's ciphertext, or the destination
    /// payload at the innermost level.
    pub inner: Vec<u8>,
    /// Routing JSON tail.
    pub tail: Vec<u8>,
}

impl FromBytes for Frame {
    fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, inner) = length_data(verify(le_u32, |len| *len as usize <= MAX_FRAME_SIZE))(input)?;
        let (input, tail) = rest(input)?;
        Ok((input, Frame {
            inner: inner.to_vec(),
            tail: tail.to_vec(),
        }))
    }
}

impl ToBytes for Frame {
    fn to_bytes<'a>(&self, buf: (&'a mut [u8], usize)) -> Result<(&'a mut [u8], usize), GenError> {
        do_gen!(buf,
            gen_cond!(
                self.inner.len() > u32::MAX as usize,
                |buf| gen_error(buf, 0)
            ) >>
            gen_le_u32!(self.inner.len() as u32) >>
            gen_slice!(self.inner.as_slice()) >>
            gen_slice!(self.tail.as_slice())
        )
    }
}

impl Frame {
    /// Create a new `Frame`.
    pub fn new(inner: Vec<u8>, tail: Vec<u8>) -> Frame {
        Frame { inner, tail }
    }

    /// Serialize into a fresh byte vector.
    pub fn to_vec(&self) -> Result<Vec<u8>, FrameError> {
        if self.inner.len() > u32::MAX as usize {
            return Err(FrameError::TooLarge(self.inner.len()));
        }
        let mut buf = vec![0; 4 + self.inner.len() + self.tail.len()];
        let (_, size) = self.to_bytes((&mut buf, 0)).expect("buffer is sized to fit the frame");
        buf.truncate(size);
        Ok(buf)
    }

    /// Parse a frame, rejecting truncated input and oversized inner
    /// blobs.
    pub fn decode(bytes: &[u8]) -> Result<Frame, FrameError> {
        if bytes.len() < 4 {
            return Err(FrameError::Truncated { need: 4, got: bytes.len() });
        }
        let size = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if size > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge(size));
        }
        if bytes.len() < 4 + size {
            return Err(FrameError::Truncated { need: 4 + size, got: bytes.len() });
        }
        Ok(Frame {
            inner: bytes[4..4 + size].to_vec(),
            tail: bytes[4 + size..].to_vec(),
        })
    }
}
