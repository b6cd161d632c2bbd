/*!
Onion request builder and transport for LSRPC service-node chains.

A request is wrapped in one layer of authenticated encryption per hop of a
randomly selected service-node path, POSTed to the entry hop and relayed
hop by hop until the terminal hop performs the destination HTTP call.
*/

#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

pub mod config;
pub mod directory;
pub mod onion;
pub mod transport;
