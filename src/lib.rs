//! docbin - sequential and positional access to flat binary document containers

pub mod cli;
pub mod container;
pub mod observability;
