/*! Onion layer containers.

Each layer a hop decrypts is a [`Frame`]: a length-prefixed inner blob
followed by a routing JSON tail telling the hop what to do with it. The
outermost, unencrypted container is the [`Wrapper`].
*/

mod frame;
mod routing;
mod wrapper;

pub use self::frame::*;
pub use self::routing::*;
pub use self::wrapper::*;
