//! Library components of the `redcap` command line client.

pub mod logging;
pub mod output;
