use super::Proxmox;
use crate::progress::{ProgressState, PROGRESS_TOTAL};
use crate::{interrupt, process, MigrateError, Result, VmId};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{BufRead, BufReader};
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::{Command, Stdio};

/// `vzdump --compress` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    Zstd,
    Lzo,
    Gzip,
    /// No compression
    #[value(name = "0")]
    #[serde(rename = "0")]
    Uncompressed,
}

impl Compression {
    pub fn as_arg(&self) -> &'static str {
        match self {
            Compression::Zstd => "zstd",
            Compression::Lzo => "lzo",
            Compression::Gzip => "gzip",
            Compression::Uncompressed => "0",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// `vzdump --mode` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupMode {
    #[default]
    Stop,
    Snapshot,
    Suspend,
}

impl BackupMode {
    pub fn as_arg(&self) -> &'static str {
        match self {
            BackupMode::Stop => "stop",
            BackupMode::Snapshot => "snapshot",
            BackupMode::Suspend => "suspend",
        }
    }
}

impl fmt::Display for BackupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

#[derive(Debug, Clone, Default)]
pub struct VzdumpOptions {
    pub compress: Compression,
    pub mode: BackupMode,
    /// Echo raw vzdump output above the progress bar
    pub verbose: bool,
    /// Draw the progress bar (off in tests and non-interactive runs)
    pub show_progress: bool,
}

fn progress_bar(vmid: VmId, visible: bool) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(
        Some(PROGRESS_TOTAL),
        if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        },
    );
    if let Ok(style) =
        ProgressStyle::with_template("{msg} {wide_bar:.cyan/blue} {pos:>3}% [{elapsed_precise}]")
    {
        bar.set_style(style);
    }
    bar.set_message(format!("VM {}", vmid));
    bar
}

impl Proxmox {
    pub fn vzdump_command(&self, vmid: VmId, dumpdir: &Path, opts: &VzdumpOptions) -> Command {
        // --notes-template is left out: some PVE versions then require --storage
        let mut cmd = Command::new(&self.tools.vzdump);
        cmd.arg(vmid.to_string())
            .arg("--dumpdir")
            .arg(dumpdir)
            .arg("--mode")
            .arg(opts.mode.as_arg())
            .arg("--compress")
            .arg(opts.compress.as_arg());
        cmd
    }

    /// Run vzdump for one VM, driving a progress bar from its output.
    ///
    /// Returns the final progress counter. On failure the last lines of
    /// output are printed to stderr and carried in the error.
    pub fn vzdump(&self, vmid: VmId, dumpdir: &Path, opts: &VzdumpOptions) -> Result<u64> {
        let mut cmd = self.vzdump_command(vmid, dumpdir, opts);
        let program = process::program_name(&cmd);

        println!("Starting export for VM {} -> {}", vmid, dumpdir.display());
        tracing::info!(
            vmid = vmid,
            dumpdir = %dumpdir.display(),
            mode = %opts.mode,
            compress = %opts.compress,
            "Starting vzdump"
        );
        process::echo(&cmd);

        // stdout and stderr share one pipe so lines arrive in order
        let (reader, writer) = std::io::pipe()?;
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(writer.try_clone()?)
            .stderr(writer)
            .process_group(0)
            .spawn()
            .map_err(|source| MigrateError::CommandSpawn {
                program: program.clone(),
                source,
            })?;
        // the Command holds copies of the write end; without this the read
        // loop never sees EOF
        drop(cmd);
        let tracked = interrupt::track(&child);

        let bar = progress_bar(vmid, opts.show_progress);
        let mut state = ProgressState::new();

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\r', '\n']);

            let delta = state.observe(line);
            if delta > 0 {
                bar.inc(delta);
            }

            if opts.verbose && !line.is_empty() {
                if opts.show_progress {
                    bar.println(line);
                } else {
                    println!("{}", line);
                }
            }
        }

        let status = child.wait()?;
        drop(tracked);
        bar.inc(state.complete(status.success()));
        let position = bar.position();
        bar.finish();

        if !status.success() {
            if let Some(signal) = interrupt::received() {
                tracing::warn!(vmid = vmid, signal = signal, "vzdump interrupted");
                return Err(MigrateError::Interrupted(signal));
            }

            let tail = state.tail();
            if !tail.is_empty() {
                eprintln!("\n--- vzdump output (tail) ---");
                for line in &tail {
                    eprintln!("{}", line);
                }
                eprintln!("--- end tail ---\n");
            }

            return Err(MigrateError::ExportFailed {
                vmid,
                code: status.code(),
                tail,
            });
        }

        tracing::info!(vmid = vmid, "vzdump finished");
        Ok(position)
    }
}

#[cfg(test)]
#[path = "vzdump_tests.rs"]
mod vzdump_tests;
