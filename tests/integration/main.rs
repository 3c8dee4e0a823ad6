//! Integration tests for adseq.
//!
//! Compiled as a single test binary; shared helpers live in `helpers`.

mod helpers;

mod cli_test;
mod scenario_test;
mod sequencing_test;
