//! Socket owner resolution through `/proc/<pid>/fd`.
//!
//! The socket tables carry no PID. Ownership is rebuilt by reading every
//! descriptor symlink of every process and matching `socket:[<inode>]`
//! targets against the inodes of the surviving entries. Processes that
//! exit or deny access while being scanned are skipped.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use dashmap::DashMap;
use rayon::prelude::*;
use watcher_common::constants::SOCKET_LINK_PREFIX;

use crate::model::{Process, SockTabEntry};

/// Maps each requested socket inode to the process holding it.
///
/// Inodes without a match are absent from the result. An empty request
/// performs no filesystem access.
pub fn resolve_owners(proc_root: &Path, inodes: &HashSet<u64>, parallel: bool) -> HashMap<u64, Process> {
    if inodes.is_empty() {
        return HashMap::new();
    }

    let mut pids = list_pids(proc_root);
    pids.sort_unstable();
    let found: DashMap<u64, Process> = DashMap::with_capacity(inodes.len());

    if parallel {
        pids.par_iter()
            .for_each(|&pid| scan_process(proc_root, pid, inodes, &found));
    } else {
        // Ascending pids: once every inode has an owner, none can be lowered.
        for &pid in &pids {
            if found.len() == inodes.len() {
                break;
            }
            scan_process(proc_root, pid, inodes, &found);
        }
    }

    tracing::debug!(
        processes = pids.len(),
        requested = inodes.len(),
        resolved = found.len(),
        "socket owner scan finished"
    );
    found.into_iter().collect()
}

/// Attaches owners to entries, looking up only inodes that can have one.
pub fn attach_owners(entries: Vec<SockTabEntry>, proc_root: &Path, parallel: bool) -> Vec<SockTabEntry> {
    let inodes: HashSet<u64> = entries
        .iter()
        .map(|e| e.inode)
        .filter(|&ino| ino != 0)
        .collect();
    let owners = resolve_owners(proc_root, &inodes, parallel);

    entries
        .into_iter()
        .map(|entry| match owners.get(&entry.inode) {
            Some(process) => entry.with_process(process.clone()),
            None => entry,
        })
        .collect()
}

/// Numeric entries of the proc root; anything else is ignored.
fn list_pids(proc_root: &Path) -> Vec<u32> {
    let Ok(dir) = fs::read_dir(proc_root) else {
        tracing::debug!(root = %proc_root.display(), "process directory unreadable");
        return Vec::new();
    };
    dir.filter_map(|entry| entry.ok()?.file_name().to_str()?.parse::<u32>().ok())
        .filter(|&pid| pid > 0)
        .collect()
}

fn scan_process(proc_root: &Path, pid: u32, wanted: &HashSet<u64>, found: &DashMap<u64, Process>) {
    let pid_dir = proc_root.join(pid.to_string());
    let fds = match fs::read_dir(pid_dir.join("fd")) {
        Ok(fds) => fds,
        Err(e) => {
            // Exited since listing, or owned by someone else.
            tracing::trace!(pid, error = %e, "skipping process");
            return;
        }
    };

    let mut name: Option<String> = None;
    for fd in fds.flatten() {
        let Ok(target) = fs::read_link(fd.path()) else {
            continue;
        };
        let Some(inode) = target.to_str().and_then(parse_socket_link) else {
            continue;
        };
        if !wanted.contains(&inode) {
            continue;
        }
        let name = name.get_or_insert_with(|| read_comm(&pid_dir));
        // A shared socket goes to its lowest pid, whatever the scan order.
        let _ = found
            .entry(inode)
            .and_modify(|owner| {
                if pid < owner.pid {
                    *owner = Process {
                        pid,
                        name: name.clone(),
                    };
                }
            })
            .or_insert_with(|| Process {
                pid,
                name: name.clone(),
            });
    }
}

/// Extracts `N` from a `socket:[N]` link target.
fn parse_socket_link(target: &str) -> Option<u64> {
    target
        .strip_prefix(SOCKET_LINK_PREFIX)?
        .strip_suffix(']')?
        .parse()
        .ok()
}

fn read_comm(pid_dir: &Path) -> String {
    fs::read_to_string(pid_dir.join("comm"))
        .map(|s| s.trim_end().to_string())
        .unwrap_or_default()
}
