//! Controller installer CLI entrypoint.
//!
//! This binary installs the Terraform Cloud controller CLI from its release
//! archive, writes its launcher and smoke-tests the result. Set `RUST_LOG`
//! (for example `RUST_LOG=tfc_installer=debug`) for diagnostic logging.

use camino::Utf8Path;
use clap::Parser;
use std::io::Write;
use tfc_installer::artefact::download::HttpFetcher;
use tfc_installer::artefact::extraction::GzipExtractor;
use tfc_installer::cli::{Cli, Command, FormulaArgs, InstallArgs, ListArgs, TargetArgs};
use tfc_installer::deps::PathProbe;
use tfc_installer::dirs::{BaseDirs, SystemBaseDirs};
use tfc_installer::error::{InstallerError, Result};
use tfc_installer::formula::Formula;
use tfc_installer::layout::{InstallLayout, default_prefix};
use tfc_installer::list_output::{format_human, format_json};
use tfc_installer::output::{DryRunInfo, caveats_text, success_message, write_stderr_line};
use tfc_installer::pipeline::{self, InstallReport, PipelineContext};
use tfc_installer::scanner::scan_installed;
use tfc_installer::wrapper::path_instructions;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &SystemBaseDirs, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(
    cli: &Cli,
    dirs: &dyn BaseDirs,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Result<()> {
    match &cli.command {
        Some(Command::Uninstall(args)) => run_uninstall(args, dirs, stderr),
        Some(Command::List(args)) => run_list(args, dirs, stdout),
        Some(Command::Test(args)) => run_test(args, dirs, stderr),
        Some(Command::Caveats(args)) => run_caveats(args, stdout),
        Some(Command::Install(_)) | None => run_install(cli.install_args(), dirs, stderr),
    }
}

/// Resolves the layout from `--prefix` or the platform default.
fn resolve_layout(prefix: Option<&Utf8Path>, dirs: &dyn BaseDirs) -> Result<InstallLayout> {
    let prefix = prefix
        .map(Utf8Path::to_path_buf)
        .or_else(|| default_prefix(dirs))
        .ok_or_else(|| {
            InstallerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine a default prefix; pass --prefix",
            ))
        })?;
    InstallLayout::new(prefix)
}

fn run_install(args: &InstallArgs, dirs: &dyn BaseDirs, stderr: &mut dyn Write) -> Result<()> {
    let mut formula = Formula::load(args.formula.as_deref())?;
    args.apply_overrides(&mut formula);
    let layout = resolve_layout(args.prefix.as_deref(), dirs)?;

    if args.dry_run {
        print_dry_run_info(args, &formula, &layout, stderr);
        return Ok(());
    }

    let context = PipelineContext {
        formula: &formula,
        layout: &layout,
        fetcher: &HttpFetcher,
        extractor: &GzipExtractor,
        probe: &PathProbe,
        archive: args.archive.as_deref().map(Utf8Path::as_std_path),
        skip_deps: args.skip_deps,
        quiet: args.quiet,
        smoke_test: !args.skip_test,
    };
    let report = pipeline::install(&context, stderr)?;

    if !args.quiet {
        report_install(&formula, &report, !args.skip_test, stderr);
    }
    Ok(())
}

fn report_install(
    formula: &Formula,
    report: &InstallReport,
    tested: bool,
    stderr: &mut dyn Write,
) {
    write_stderr_line(stderr, "");
    write_stderr_line(
        stderr,
        success_message(formula.name(), report.version.as_str(), &report.launcher),
    );
    if tested {
        write_stderr_line(stderr, "Smoke test passed.");
    }
    for pruned in &report.pruned {
        write_stderr_line(stderr, format!("Removed previous version {pruned}"));
    }
    for tool in &report.missing_optional {
        write_stderr_line(
            stderr,
            format!("Optional tool `{tool}` was not found; install it for richer output."),
        );
    }

    if !report.launcher_dir_in_path {
        write_stderr_line(stderr, "");
        let bin_dir = report
            .launcher
            .parent()
            .unwrap_or(report.launcher.as_path());
        write_stderr_line(stderr, path_instructions(bin_dir));
    }

    if let Some(caveats) = formula.caveats() {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, caveats_text(caveats));
    }
}

/// Prints dry run configuration information.
fn print_dry_run_info(
    args: &InstallArgs,
    formula: &Formula,
    layout: &InstallLayout,
    stderr: &mut dyn Write,
) {
    let settings = formula.install();
    let version = formula.release().version();
    let install_root = layout.install_root(formula.name(), version);
    let launcher = layout.launcher_path(&settings.launcher);
    let source = args
        .archive
        .as_ref()
        .map_or_else(|| formula.release().url().to_string(), ToString::to_string);

    let info = DryRunInfo {
        name: formula.name(),
        version: version.as_str(),
        source: &source,
        install_root: &install_root,
        launcher: &launcher,
        interpreter: &settings.interpreter,
        version_policy: settings.version_policy,
        entrypoint_depth: settings.entrypoint_depth,
        skip_deps: args.skip_deps,
        skip_test: args.skip_test,
    };
    write_stderr_line(stderr, info.display_text());
}

fn run_uninstall(args: &TargetArgs, dirs: &dyn BaseDirs, stderr: &mut dyn Write) -> Result<()> {
    let formula = Formula::load(args.formula.as_deref())?;
    let layout = resolve_layout(args.prefix.as_deref(), dirs)?;
    let report = pipeline::uninstall(&formula, &layout)?;

    for version in &report.removed {
        write_stderr_line(stderr, format!("Removed {} {version}", formula.name()));
    }
    if report.launcher_removed {
        write_stderr_line(
            stderr,
            format!(
                "Removed launcher {}",
                layout.launcher_path(&formula.install().launcher)
            ),
        );
    }
    Ok(())
}

fn run_list(args: &ListArgs, dirs: &dyn BaseDirs, stdout: &mut dyn Write) -> Result<()> {
    let layout = resolve_layout(args.prefix.as_deref(), dirs)?;
    let installed = scan_installed(&layout.libexec_dir())?;

    let output = if args.json {
        format_json(&installed)
    } else {
        format_human(&installed)
    };
    writeln!(stdout, "{output}").map_err(|source| InstallerError::OutputFailed { source })
}

fn run_test(args: &TargetArgs, dirs: &dyn BaseDirs, stderr: &mut dyn Write) -> Result<()> {
    let formula = Formula::load(args.formula.as_deref())?;
    let layout = resolve_layout(args.prefix.as_deref(), dirs)?;
    let stdout = pipeline::verify_installed(&formula, &layout)?;
    write_stderr_line(stderr, stdout.trim_end());
    write_stderr_line(stderr, "Smoke test passed.");
    Ok(())
}

fn run_caveats(args: &FormulaArgs, stdout: &mut dyn Write) -> Result<()> {
    let formula = Formula::load(args.formula.as_deref())?;
    let text = formula.caveats().unwrap_or("No caveats.");
    writeln!(stdout, "{text}").map_err(|source| InstallerError::OutputFailed { source })
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format!("error: {}: {err}", err.step()));
            1
        }
    }
}
