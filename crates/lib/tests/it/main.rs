/*! Integration tests for stagedoc.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - document: Tests for queueing intents, the data view and JSON conversion
 * - transaction: Tests for the commit engine, mirrors, validation and callbacks
 * - store: Tests for the in-memory store and its retry behavior
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("stagedoc=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod context;
mod document;
mod helpers;
mod transaction;
