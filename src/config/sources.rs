//! Configuration sources, lowest precedence first.

pub mod environment;
pub mod global_file;
pub mod local_file;

/// Environment lookup, injectable so loading can be tested without touching the process env
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;
