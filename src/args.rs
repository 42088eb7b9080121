//! Command-line arguments for the `elide-build` binary.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Resolve, verify, install and run the Elide CLI for a project.
#[derive(Parser, Debug)]
#[command(name = "elide-build")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install the project's Elide dependencies:\n",
    "    $ elide-build install\n\n",
    "  Print the version of the resolved binary:\n",
    "    $ elide-build version\n\n",
    "  Run an arbitrary Elide command as a named task:\n",
    "    $ elide-build exec --task elideRun -- run main.ts\n",
))]
pub struct Cli {
    /// Project directory holding elide.toml [default: current directory].
    #[arg(long, value_name = "DIR", global = true)]
    pub project_dir: Option<Utf8PathBuf>,

    /// Build directory [default: <project-dir>/build].
    #[arg(long, value_name = "DIR", global = true)]
    pub build_dir: Option<Utf8PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run `elide install` when the project has a manifest.
    Install,

    /// Print the version reported by the resolved binary.
    Version,

    /// Run the binary with the given arguments.
    Exec(ExecArgs),
}

/// Arguments for `exec`.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
pub struct ExecArgs {
    /// Task name used for the completion marker.
    #[arg(long, default_value = "elideExec")]
    pub task: String,

    /// Run even when the completion marker exists.
    #[arg(long)]
    pub force: bool,

    /// Arguments passed to the binary.
    #[arg(last = true)]
    pub args: Vec<String>,
}
