// Exit codes for precise CI triage
use fuseprobe_common::{CatalogError, ConfigError, ProfileError, StoreError};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_GENERIC_FAIL: i32 = 1;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_CATALOG: i32 = 3;
pub const EXIT_BACKEND: i32 = 4;
pub const EXIT_STORE: i32 = 5;

/// Exit code for the first typed error found in the chain.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if cause.is::<ConfigError>() {
            return EXIT_CONFIG;
        }
        if cause.is::<CatalogError>() {
            return EXIT_CATALOG;
        }
        if cause.is::<ProfileError>() {
            return EXIT_BACKEND;
        }
        if cause.is::<StoreError>() {
            return EXIT_STORE;
        }
    }
    EXIT_GENERIC_FAIL
}
