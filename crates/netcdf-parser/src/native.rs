//! Process-level helpers around the native netCDF/HDF5 libraries.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes such as `scale_factor` that don't exist). This creates log spam
/// like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// It only needs to be called once per process, but is safe to call multiple
/// times. Call it before the first netCDF operation.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Path of a scratch sibling for writing `destination` atomically.
///
/// The name is hidden and unique per process and call, so concurrent writers
/// in one directory never collide. Same directory means the final rename does
/// not cross filesystems.
pub(crate) fn temp_sibling(destination: &Path) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let pid = std::process::id();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let file_name = destination
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("field.nc");

    destination.with_file_name(format!(".{}.tmp-{}-{}", file_name, pid, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_sibling_uniqueness() {
        let dest = Path::new("/data/out/era5_mavg.nc");
        let a = temp_sibling(dest);
        let b = temp_sibling(dest);
        assert_ne!(a, b, "Temp filenames should be unique");
        assert_eq!(a.parent(), dest.parent());
        assert!(a
            .file_name()
            .and_then(|s| s.to_str())
            .map(|s| s.starts_with(".era5_mavg.nc.tmp-"))
            .unwrap_or(false));
    }

    #[test]
    fn test_silence_is_idempotent() {
        silence_hdf5_errors();
        silence_hdf5_errors();
    }
}
