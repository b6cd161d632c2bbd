/*! Wire containers for LSRPC onion requests.

Every onion layer embeds the next one in a length-prefixed frame whose tail
is a routing JSON record. This crate holds the frame and wrapper codecs,
the routing records, and the directory-facing value types.
*/

#![forbid(unsafe_code)]

#[macro_use]
extern crate cookie_factory;

#[cfg(test)]
#[macro_use]
mod macros;

pub mod destination;
pub mod onion;
pub mod service_node;
