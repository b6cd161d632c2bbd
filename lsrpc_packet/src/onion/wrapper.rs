/*! Outermost onion container, sent to the entry hop over HTTP.
*/

use nom::combinator::{map_res, rest, verify};
use nom::multi::length_data;
use nom::number::complete::le_u32;

use lsrpc_binary_io::*;

use super::frame::{Frame, FrameError, MAX_FRAME_SIZE};
use super::routing::WrapperMeta;

/** Outermost onion container. Unlike the layers inside it, the wrapper
itself is not encrypted: the entry hop reads the metadata tail in the
clear to learn which ephemeral key the outermost layer was sealed with.

Serialized form:

Length   | Content
-------- | ------
`4`      | Size of the sealed blob (LE)
variable | Sealed outermost layer
variable | Metadata JSON: `{"ephemeral_key":<hex64>,"enc_type":"aes-gcm"}`

*/
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Wrapper {
    /// Sealed outermost layer.
    pub blob: Vec<u8>,
    /// Plaintext metadata for the entry hop.
    pub meta: WrapperMeta,
}

impl FromBytes for Wrapper {
    fn from_bytes(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, blob) = length_data(verify(le_u32, |len| *len as usize <= MAX_FRAME_SIZE))(input)?;
        let (input, meta) = map_res(rest, |tail: &[u8]| serde_json::from_slice::<WrapperMeta>(tail))(input)?;
        Ok((input, Wrapper {
            blob: blob.to_vec(),
            meta,
        }))
    }
}

impl ToBytes for Wrapper {
    fn to_bytes<'a>(&self, buf: (&'a mut [u8], usize)) -> Result<(&'a mut [u8], usize), GenError> {
        let meta = serde_json::to_vec(&self.meta).map_err(|_| GenError::CustomError(0))?;
        do_gen!(buf,
            gen_cond!(
                self.blob.len() > u32::MAX as usize,
                |buf| gen_error(buf, 0)
            ) >>
            gen_le_u32!(self.blob.len() as u32) >>
            gen_slice!(self.blob.as_slice()) >>
            gen_slice!(meta.as_slice())
        )
    }
}

impl Wrapper {
    /// Create a new `Wrapper`.
    pub fn new(blob: Vec<u8>, meta: WrapperMeta) -> Wrapper {
        Wrapper { blob, meta }
    }

    /// Serialize into the byte string POSTed to the entry hop.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let meta = serde_json::to_vec(&self.meta).expect("wrapper metadata always serializes");
        Frame::new(self.blob.clone(), meta).to_vec()
    }

    /// Parse a wrapper, validating the frame and the metadata tail.
    pub fn decode(bytes: &[u8]) -> Result<Wrapper, FrameError> {
        let frame = Frame::decode(bytes)?;
        let meta = serde_json::from_slice(&frame.tail).map_err(|_| FrameError::BadMeta)?;
        Ok(Wrapper {
            blob: frame.inner,
            meta,
        })
    }
}
