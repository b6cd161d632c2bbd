/*! Onion request construction.
*/

mod builder;
mod errors;
mod path;

pub use self::builder::*;
pub use self::errors::*;
pub use self::path::*;
