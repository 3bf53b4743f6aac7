//! SQLite extension registration
//!
//! Registers the statically linked sqlite-vec extension. Registration must
//! happen before any database connections are created.
#![allow(unsafe_code)]

use std::ffi::c_char;
use std::sync::Once;

/// Ensure the extension is only registered once
static INIT: Once = Once::new();

/// Register the sqlite-vec extension with SQLite.
///
/// Uses `sqlite3_auto_extension()` so the vec functions are loaded into
/// every connection created after this call. Safe to call repeatedly; the
/// `Once` guard makes it a no-op after the first call. A registration
/// failure is logged and left for the availability probe to detect, which
/// drops the store onto the in-process scan path.
pub fn register_sqlite_vec() {
    INIT.call_once(|| {
        unsafe {
            // sqlite3_auto_extension expects:
            // unsafe extern "C" fn(*mut sqlite3, *mut *mut c_char, *const sqlite3_api_routines) -> i32
            let vec_init = sqlite_vec::sqlite3_vec_init as *const ();
            let vec_init_fn: unsafe extern "C" fn(
                *mut libsqlite3_sys::sqlite3,
                *mut *mut c_char,
                *const libsqlite3_sys::sqlite3_api_routines,
            ) -> i32 = std::mem::transmute(vec_init);

            let result = libsqlite3_sys::sqlite3_auto_extension(Some(vec_init_fn));

            if result == libsqlite3_sys::SQLITE_OK {
                tracing::debug!("sqlite-vec extension registered");
            } else {
                tracing::warn!(
                    "sqlite-vec registration failed with code {result}, \
                     similarity search will use the in-process scan"
                );
            }
        }
    });
}

/// Probe whether the vec functions are available on this pool.
///
/// Call after a connection is established; registration alone does not
/// guarantee the extension loaded.
pub async fn is_vec_available(pool: &sqlx::SqlitePool) -> bool {
    matches!(
        sqlx::query("SELECT vec_version() as version")
            .fetch_optional(pool)
            .await,
        Ok(Some(_))
    )
}
