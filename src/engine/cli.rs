//! CLI command handler: unpack to stdout or pack from stdin.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::io;
use std::path::{Path, PathBuf};

use crate::engine::arg_parser::{Cli, Commands};
use crate::fs;
use crate::transport::NdjsonTransport;
use crate::utils::{set_verbose, setup_logging};
use crate::utils::tarbridge_toml::{apply_env_to_opts, apply_file_to_opts, load_tarbridge_toml};
use crate::{FailurePolicy, Opts, Verify, pack_from, unpack_to};

/// Layer defaults → config file → environment → CLI flags.
pub fn build_opts(cli: &Cli, config_dir: &Path) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = load_tarbridge_toml(config_dir) {
        apply_file_to_opts(&file, &mut opts);
    }
    apply_env_to_opts(config_dir, &mut opts);

    let common = &cli.common;
    if common.verbose {
        opts.verbose = true;
    }
    if common.continue_on_error {
        opts.policy = FailurePolicy::Continue;
    }
    if let Some(n) = common.queue_capacity {
        opts.queue_capacity = n;
    }
    match &cli.command {
        Commands::Unpack { input } => {
            if let Some(p) = input {
                opts.input = Some(p.clone());
            }
        }
        Commands::Pack { output, batch_size } => {
            if let Some(p) = output {
                opts.output = Some(p.clone());
            }
            if let Some(n) = batch_size {
                opts.batch_size = *n;
            }
        }
    }
    opts
}

fn report_verify(verify: &Verify) {
    match serde_json::to_string(verify) {
        Ok(line) if verify.success => info!("verify {}", line),
        Ok(line) => warn!("verify {}", line),
        Err(e) => warn!("verify record not serializable: {}", e),
    }
}

/// Run the selected subcommand against the real filesystem and stdio.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let config_dir = cli
        .common
        .config_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    // Log from the flag first so config-file and env warnings are not lost.
    setup_logging(cli.common.verbose);
    let opts = build_opts(cli, &config_dir);
    set_verbose(opts.verbose);
    debug!("config dir: {}", config_dir.display());

    match cli.command {
        Commands::Unpack { .. } => {
            let stdout = io::stdout();
            let mut transport = NdjsonTransport::new(io::empty(), stdout.lock());
            let n = unpack_to(fs::os(), &opts, &mut transport).context("unpack")?;
            debug!("unpacked {} message(s)", n);
        }
        Commands::Pack { .. } => {
            let stdin = io::stdin();
            let mut transport = NdjsonTransport::new(stdin.lock(), io::sink());
            let n = pack_from(fs::os(), &opts, &mut transport, report_verify).context("pack")?;
            debug!("wrote {} batch file(s)", n);
        }
    }
    Ok(())
}
