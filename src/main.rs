use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use invoke_binary::config::{CliOverrides, LauncherConfig, ResolvedSettings};
use invoke_binary::launcher::{self, ChildOutcome, ValidateInputs};
use invoke_binary::platform::{self, HostPlatform};
use invoke_binary::{actions, output};

/// Runs the bundled `validate` binary that matches this runner's platform.
///
/// Action inputs are read from `INPUT_*` environment variables and forwarded
/// to the binary; its exit code becomes the launcher's exit code.
#[derive(Parser, Debug)]
#[command(
    name = "invoke-binary",
    version,
    about,
    after_help = "Examples:\n  invoke-binary\n  invoke-binary --dry-run\n  invoke-binary --bin-dir ./dist --strict-status\n  invoke-binary platform"
)]
struct Cli {
    /// Print the resolved binary and command line before running.
    #[arg(long, global = true)]
    verbose: bool,

    /// Directory holding the action-linux-* binaries.
    #[arg(long, global = true, value_name = "DIR")]
    bin_dir: Option<PathBuf>,

    /// Config file (defaults to invoke-binary.toml next to the launcher).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fail with a nonzero code when the child ends without an exit status.
    #[arg(long, global = true)]
    strict_status: bool,

    /// Resolve and print the command line without running it.
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the bundled binary (the default).
    Run,
    /// Show the detected platform and the binary that would be selected.
    Platform,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

fn load_settings(cli: &Cli, entry_point: &Path) -> Result<ResolvedSettings> {
    let launcher_dir = entry_point.parent().unwrap_or_else(|| Path::new("."));
    let config_path = LauncherConfig::config_path(cli.config.as_deref(), launcher_dir);
    let config = LauncherConfig::load_from(&config_path)?;
    let overrides = CliOverrides {
        bin_dir: cli.bin_dir.clone(),
        strict_status: cli.strict_status,
        verbose: cli.verbose,
    };
    config.resolve(&overrides)
}

// ---------------------------------------------------------------------------
// Subcommand dispatch
// ---------------------------------------------------------------------------

/// Launch the bundled binary and return the exit code to terminate with.
///
/// Steps:
/// 1. Detect the platform and pick the binary variant
/// 2. Resolve the binary directory from the entry point (or the override)
/// 3. Read action inputs and build the argument vector
/// 4. Spawn with inherited stdio and wait
fn run_launch(settings: &ResolvedSettings, entry_point: &Path, dry_run: bool) -> Result<i32> {
    let platform = HostPlatform::detect();
    let inputs = ValidateInputs::from_env();

    let command_line = launcher::prepare(
        &platform,
        entry_point,
        settings.bin_dir.as_deref(),
        &inputs,
        &mut std::io::stdout(),
    )?;

    actions::debug(&format!("platform: {platform}"));
    actions::debug(&format!("command: {command_line}"));
    if output::is_verbose() {
        output::action("Launching", &command_line.program.display().to_string());
        output::detail(&format!("platform: {platform}"));
        output::detail(&format!("command: {command_line}"));
    }

    if dry_run {
        println!("{command_line}");
        return Ok(0);
    }

    let outcome = launcher::run(&command_line);
    match &outcome {
        ChildOutcome::Exited(code) => {
            output::verbose_detail(&format!("child exited with code {code}"));
        }
        ChildOutcome::Terminated(signal) => {
            let reason = match signal {
                Some(sig) => format!("signal {sig}"),
                None => "an unknown cause".to_string(),
            };
            output::note(&format!(
                "{} was terminated by {reason}",
                command_line.program.display()
            ));
        }
        ChildOutcome::SpawnFailed(err) => {
            let message = format!(
                "failed to start {}: {err}",
                command_line.program.display()
            );
            actions::error(&message);
            output::fail("Error", &message);
        }
    }

    Ok(outcome.exit_code(settings.indeterminate_status))
}

fn run_platform(settings: &ResolvedSettings, entry_point: &Path) -> Result<i32> {
    run_platform_inner(
        &mut std::io::stderr(),
        &HostPlatform::detect(),
        settings,
        entry_point,
    )?;
    Ok(0)
}

/// Inner implementation of `run_platform` that writes to a `Write` impl.
/// This allows tests to capture the output for verification.
fn run_platform_inner(
    w: &mut dyn Write,
    platform: &HostPlatform,
    settings: &ResolvedSettings,
    entry_point: &Path,
) -> Result<()> {
    writeln!(w, "[invoke-binary] Platform").ok();
    writeln!(w, "[invoke-binary]   Host: {platform}").ok();
    writeln!(w, "[invoke-binary]   Build target: {}", platform::build_target()).ok();

    let dir = match &settings.bin_dir {
        Some(dir) => dir.clone(),
        None => launcher::resolve_binary_dir(entry_point),
    };
    writeln!(w, "[invoke-binary]   Binary directory: {}", dir.display()).ok();

    match platform::select_binary(platform) {
        Ok(variant) => {
            let path = dir.join(variant.file_name());
            let present = if path.is_file() { "yes" } else { "no" };
            writeln!(
                w,
                "[invoke-binary]   Binary: {} (present: {present})",
                path.display()
            )
            .ok();
        }
        Err(e) => {
            writeln!(w, "[invoke-binary]   Binary: (none - {e})").ok();
        }
    }

    writeln!(
        w,
        "[invoke-binary]   Indeterminate status: {:?}",
        settings.indeterminate_status
    )
    .ok();

    Ok(())
}

fn dispatch(cli: Cli) -> Result<i32> {
    let entry_point =
        std::env::current_exe().context("could not determine the launcher's own path")?;
    let settings = load_settings(&cli, &entry_point)?;
    output::set_verbose(settings.verbose);

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_launch(&settings, &entry_point, cli.dry_run),
        Command::Platform => run_platform(&settings, &entry_point),
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let cli = Cli::parse();

    match dispatch(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            actions::error(&format!("{e:#}"));
            output::fail("Error", &format!("{e:#}"));
            process::exit(1);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
