//! Shared helpers for live integration tests.
//!
//! Each gated test binary pulls in only some of these.
#![allow(dead_code)]

/// Check if a scratch Postgres for live tests is configured
///
/// `TEST_DATABASE_URL` must point at a disposable database; the tests create
/// and truncate an `articles` table there.
pub fn has_scratch_database() -> bool {
    dotenvy::dotenv().ok();
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// Resolve the scratch database URL
pub fn scratch_database_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("TEST_DATABASE_URL").unwrap_or_default()
}

/// Check if a docker binary is available
pub fn has_docker() -> bool {
    which::which("docker").is_ok()
}

/// Skip test if no scratch database is configured
#[macro_export]
macro_rules! skip_if_no_scratch_database {
    () => {
        if !$crate::common::has_scratch_database() {
            eprintln!("Skipping test: TEST_DATABASE_URL not set in environment or .env");
            return;
        }
    };
}

/// Skip test if docker is not installed
#[macro_export]
macro_rules! skip_if_no_docker {
    () => {
        if !$crate::common::has_docker() {
            eprintln!("Skipping test: docker not found in PATH");
            return;
        }
    };
}
