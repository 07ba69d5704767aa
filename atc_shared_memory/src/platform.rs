//! Linux-specific shared memory operations

use crate::error::{ShmError, ShmResult};
use memmap2::{MmapMut, MmapOptions};
use nix::unistd::getpid;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;

/// Directory backing all ATC segments.
pub const SHM_DIR: &str = "/dev/shm";

/// Filesystem path of a named ATC segment.
pub fn segment_path(name: &str) -> PathBuf {
    PathBuf::from(format!("{SHM_DIR}/atc_{name}"))
}

/// Create the backing file for a new segment and map it.
///
/// Fails with [`ShmError::AlreadyExists`] if the file is present: segment
/// names are fixed and owned by exactly one creator.
pub fn create_segment_mmap(name: &str, total_size: usize) -> ShmResult<MmapMut> {
    let path = segment_path(name);
    let file = OpenOptions::new()
        .create_new(true)
        .read(true)
        .write(true)
        .mode(0o600)
        .open(&path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => ShmError::AlreadyExists {
                name: name.to_string(),
            },
            _ => ShmError::Io { source: e },
        })?;

    file.set_len(total_size as u64)?;

    let mmap = unsafe { MmapOptions::new().populate().map_mut(&file)? };
    Ok(mmap)
}

/// Map an existing segment.
pub fn attach_segment_mmap(name: &str) -> ShmResult<MmapMut> {
    let path = segment_path(name);
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ShmError::NotFound {
                name: name.to_string(),
            },
            _ => ShmError::Io { source: e },
        })?;

    let mmap = unsafe { MmapOptions::new().map_mut(&file)? };
    Ok(mmap)
}

/// Remove a segment's backing file. Missing files are not an error.
pub fn unlink_segment(name: &str) {
    let _ = std::fs::remove_file(segment_path(name));
}

/// Check if a process is alive using `kill(pid, 0)`.
pub fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Null signal tests for existence without delivering anything.
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::Error::ESRCH) => false,
        Err(nix::Error::EPERM) => true,
        Err(_) => false,
    }
}

/// Get the current process ID.
pub fn current_pid() -> u32 {
    getpid().as_raw() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_layout() {
        assert_eq!(
            segment_path("fleet"),
            PathBuf::from("/dev/shm/atc_fleet")
        );
    }

    #[test]
    fn create_attach_unlink_cycle() {
        let name = format!("platform_test_{}", std::process::id());
        let mmap = create_segment_mmap(&name, 4096).unwrap();
        assert!(mmap.len() >= 4096);

        // Second create must refuse.
        assert!(matches!(
            create_segment_mmap(&name, 4096),
            Err(ShmError::AlreadyExists { .. })
        ));

        // Attach sees the same file.
        let attached = attach_segment_mmap(&name).unwrap();
        assert!(attached.len() >= 4096);

        unlink_segment(&name);
        assert!(matches!(
            attach_segment_mmap(&name),
            Err(ShmError::NotFound { .. })
        ));
    }

    #[test]
    fn own_process_is_alive() {
        assert!(is_process_alive(current_pid()));
        // Unallocatable pid (beyond any pid_max).
        assert!(!is_process_alive(i32::MAX as u32));
    }
}
