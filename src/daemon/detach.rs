// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-photoacoustic project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Detach from the controlling terminal.
//!
//! Must run before any thread is started, in particular before the tokio
//! runtime is built.

use std::ffi::CStr;
use std::io;

use anyhow::{bail, Result};
use log::info;

const ROOT_DIR: &CStr = c"/";
const DEV_NULL: &CStr = c"/dev/null";

/// Fork into the background and start a new session.
///
/// The parent process exits. In the child stdin and stdout point to
/// `/dev/null`; stderr is kept so log output is not lost.
pub fn detach() -> Result<()> {
    // SAFETY: called while the process is still single threaded
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        bail!("fork failed: {}", io::Error::last_os_error());
    }
    if pid > 0 {
        info!("Daemon running in background as pid {}", pid);
        std::process::exit(0);
    }

    // SAFETY: plain libc calls on constant C strings and standard descriptors
    unsafe {
        if libc::setsid() < 0 {
            bail!("setsid failed: {}", io::Error::last_os_error());
        }
        if libc::chdir(ROOT_DIR.as_ptr()) < 0 {
            bail!("chdir failed: {}", io::Error::last_os_error());
        }
        let null = libc::open(DEV_NULL.as_ptr(), libc::O_RDWR);
        if null < 0 {
            bail!("cannot open /dev/null: {}", io::Error::last_os_error());
        }
        libc::dup2(null, libc::STDIN_FILENO);
        libc::dup2(null, libc::STDOUT_FILENO);
        if null > libc::STDERR_FILENO {
            libc::close(null);
        }
    }
    Ok(())
}
