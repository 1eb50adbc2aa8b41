//! CLI argument definitions for the controller installer.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint to keep the binary small and focused on
//! orchestration.

use crate::formula::Formula;
use crate::permissions::EntrypointDepth;
use crate::wrapper::VersionPolicy;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Install the Terraform Cloud controller CLI.
#[derive(Parser, Debug)]
#[command(name = "tfc-installer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Install the Terraform Cloud controller CLI.\n\n",
    "tfc_controller is a bash script bundle. This installer downloads a release ",
    "archive, verifies its SHA-256 checksum, stages it under ",
    "<prefix>/libexec/<name>/<version>, marks its entrypoints executable and ",
    "writes a launcher to <prefix>/bin that forwards every argument to the ",
    "real script.\n\n",
    "The release is described by a formula. The controller formula is built in; ",
    "use --formula to install from another TOML formula.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install the built-in release into ~/.local:\n",
    "    $ tfc-installer\n\n",
    "  Install into /usr/local from a downloaded archive:\n",
    "    $ tfc-installer install --prefix /usr/local --archive v1.0.4.tar.gz\n\n",
    "  Let the script report its own version:\n",
    "    $ tfc-installer --version-policy payload\n\n",
    "  List installed versions as JSON:\n",
    "    $ tfc-installer list --json\n\n",
    "  Re-run the smoke test:\n",
    "    $ tfc-installer test\n\n",
    "For more information, see: https://github.com/raymonepping/tfc_controller",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Install arguments (used when no subcommand is given).
    #[command(flatten)]
    pub install: InstallArgs,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Install the release (default when no subcommand given).
    Install(InstallArgs),

    /// Remove the launcher and every installed version.
    Uninstall(TargetArgs),

    /// List installed packages.
    List(ListArgs),

    /// Run the smoke test against the installed launcher.
    Test(TargetArgs),

    /// Print the formula's post-install notes.
    Caveats(FormulaArgs),
}

/// Arguments for the install command.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallArgs {
    /// Formula file to install [default: built-in controller formula].
    #[arg(short, long, value_name = "FILE")]
    pub formula: Option<Utf8PathBuf>,

    /// Install from a local archive instead of downloading the formula URL.
    #[arg(short, long, value_name = "FILE")]
    pub archive: Option<Utf8PathBuf>,

    /// Installation prefix [default: parent of the user's bin directory].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,

    /// Interpreter for the primary entrypoint, overriding the formula.
    #[arg(long, value_name = "PATH")]
    pub interpreter: Option<String>,

    /// Where the reported version comes from, overriding the formula.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub version_policy: Option<VersionPolicy>,

    /// Mark files in nested entrypoint directories executable as well.
    #[arg(long)]
    pub recursive_entrypoints: bool,

    /// Show what would be installed and exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,

    /// Continue when required runtime tools are missing.
    #[arg(long)]
    pub skip_deps: bool,

    /// Skip the post-install smoke test.
    #[arg(long)]
    pub skip_test: bool,
}

/// Arguments naming an installed package.
#[derive(Parser, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Formula file [default: built-in controller formula].
    #[arg(short, long, value_name = "FILE")]
    pub formula: Option<Utf8PathBuf>,

    /// Installation prefix [default: parent of the user's bin directory].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,
}

/// Arguments for the list command.
#[derive(Parser, Debug, Clone, Default)]
pub struct ListArgs {
    /// Output in JSON format for scripting.
    #[arg(long)]
    pub json: bool,

    /// Installation prefix to scan [default: parent of the user's bin directory].
    #[arg(short, long, value_name = "DIR")]
    pub prefix: Option<Utf8PathBuf>,
}

/// Arguments for the caveats command.
#[derive(Parser, Debug, Clone, Default)]
pub struct FormulaArgs {
    /// Formula file [default: built-in controller formula].
    #[arg(short, long, value_name = "FILE")]
    pub formula: Option<Utf8PathBuf>,
}

impl InstallArgs {
    /// Apply command-line overrides to a loaded formula.
    ///
    /// # Examples
    ///
    /// ```
    /// use tfc_installer::cli::InstallArgs;
    /// use tfc_installer::formula::Formula;
    /// use tfc_installer::permissions::EntrypointDepth;
    /// use tfc_installer::wrapper::VersionPolicy;
    ///
    /// let mut formula = Formula::builtin()?;
    /// let args = InstallArgs {
    ///     version_policy: Some(VersionPolicy::Payload),
    ///     recursive_entrypoints: true,
    ///     ..InstallArgs::default()
    /// };
    /// args.apply_overrides(&mut formula);
    /// assert_eq!(formula.install().version_policy, VersionPolicy::Payload);
    /// assert_eq!(formula.install().entrypoint_depth, EntrypointDepth::Recursive);
    /// # Ok::<(), tfc_installer::formula::FormulaError>(())
    /// ```
    pub fn apply_overrides(&self, formula: &mut Formula) {
        let settings = formula.install_mut();
        if let Some(interpreter) = &self.interpreter {
            settings.interpreter.clone_from(interpreter);
        }
        if let Some(policy) = self.version_policy {
            settings.version_policy = policy;
        }
        if self.recursive_entrypoints {
            settings.entrypoint_depth = EntrypointDepth::Recursive;
        }
    }
}

impl Cli {
    /// Returns the effective install arguments.
    ///
    /// If an `Install` subcommand was provided, returns those arguments.
    /// Otherwise returns the flattened install arguments.
    ///
    /// # Note
    ///
    /// When another subcommand is active, this returns the default flattened
    /// install arguments. Callers should check `self.command` first.
    #[must_use]
    pub fn install_args(&self) -> &InstallArgs {
        match &self.command {
            Some(Command::Install(args)) => args,
            _ => &self.install,
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
