use std::io::{self, Read};

use anyhow::{bail, Error};

use crate::error::CompletionError;
use crate::services::EnhanceError;

pub mod config;
pub mod enhance;
pub mod key;
pub mod prompts;
pub mod roles;
pub mod usage;

/// Reads all of stdin, failing when nothing was piped in.
pub fn read_stdin(what: &str) -> Result<String, Error> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    if buffer.trim().is_empty() {
        bail!("No {} given and nothing on stdin", what);
    }
    Ok(buffer)
}

fn completion_error(err: &Error) -> Option<&CompletionError> {
    if let Some(e) = err.downcast_ref::<CompletionError>() {
        return Some(e);
    }
    match err.downcast_ref::<EnhanceError>() {
        Some(EnhanceError::Completion(e)) => Some(e),
        _ => None,
    }
}

/// User-facing rendering of a command failure.
pub fn describe(err: &Error) -> String {
    match completion_error(err) {
        Some(e) => {
            let mut out = format!("error[{}]: {}\n  hint: {}", e.code(), e, e.suggestion());
            if let Some(secs) = e.wait_hint() {
                out.push_str(&format!("\n  retry after: {}s", secs));
            }
            out
        }
        None => format!("error: {:#}", err),
    }
}
