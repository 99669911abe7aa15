//! `esscrollctl`: scrolled search from the command line.
//!
//! The binary is a thin wrapper over [`cli::run`]; everything here is also
//! usable as a library by tools that want the same flags and output.

pub mod cli;
pub mod output;
