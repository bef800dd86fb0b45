//! Transaction envelope with bounded retry.
//!
//! RULE: Only this module calls begin/commit/rollback on a backend.
//! Protocols are plain units of work and never manage their own scope.

use crate::{backend::StorageBackend, error::DriverResult};
use log::debug;

/// Run `unit` inside a transaction scope, retrying on failure.
///
/// With `transactional == false` the unit runs exactly once with no
/// scope at all: partial writes of a failed attempt are not undone,
/// so retrying would not be safe. Otherwise each attempt is
/// begin, unit, commit; any failure (including a failed commit) rolls
/// back and counts as one attempt. The last error is returned once
/// `max_attempts` is exhausted. No backoff between attempts.
pub fn run_with_retries<T, F>(
    backend: &mut dyn StorageBackend,
    max_attempts: u32,
    transactional: bool,
    mut unit: F,
) -> DriverResult<T>
where
    F: FnMut(&mut dyn StorageBackend) -> DriverResult<T>,
{
    if !transactional {
        return unit(backend);
    }

    let attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match attempt_once(backend, &mut unit) {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                debug!("attempt {attempt}/{attempts} failed, retrying: {e}");
                attempt += 1;
            }
        }
    }
}

fn attempt_once<T, F>(backend: &mut dyn StorageBackend, unit: &mut F) -> DriverResult<T>
where
    F: FnMut(&mut dyn StorageBackend) -> DriverResult<T>,
{
    backend.begin()?;
    let outcome = unit(backend).and_then(|value| {
        backend.commit()?;
        Ok(value)
    });
    if outcome.is_err() {
        if let Err(e) = backend.rollback() {
            debug!("rollback failed: {e}");
        }
    }
    outcome
}
