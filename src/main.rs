//! `elide-build` entrypoint.
//!
//! Loads the project settings, prepares the Elide binary for this build and
//! runs the requested subcommand. Errors are printed to stderr and turn into
//! exit status 1.

use camino::Utf8PathBuf;
use clap::Parser;
use elide_build::args::{Cli, Command, ExecArgs};
use elide_build::exec::{ExecOutcome, ExecTask};
use elide_build::{BuildError, BuildPipeline, ElideCli, Result, Settings};
use log::info;
use std::io::Write;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let exit_code = match run(&cli, &mut stdout) {
        Ok(()) => 0,
        Err(err) => {
            write_line(&mut stderr, format!("error: {err}"));
            1
        }
    };
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write) -> Result<()> {
    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => current_dir()?,
    };
    let build_dir = Settings::build_dir(&project_dir, cli.build_dir.clone());
    let settings = Settings::load(&project_dir)?;
    let pipeline = BuildPipeline::new(settings, &project_dir, &build_dir)?;

    let outcome = pipeline.prepare().and_then(|prepared| {
        let binary = prepared.cli.as_ref();
        match &cli.command {
            Command::Install => match pipeline.install_task() {
                Some(task) => run_task(task, binary, false),
                None => Ok(()),
            },
            Command::Version => print_version(binary, stdout),
            Command::Exec(args) => run_exec(&pipeline, args, binary),
        }
    });

    pipeline.shutdown();
    outcome
}

fn run_exec(pipeline: &BuildPipeline, args: &ExecArgs, binary: Option<&ElideCli>) -> Result<()> {
    let task = pipeline.exec_task(&args.task).args(args.args.iter().cloned());
    run_task(task, binary, args.force)
}

fn run_task(task: ExecTask, binary: Option<&ElideCli>, force: bool) -> Result<()> {
    if !force && task.is_up_to_date(binary) {
        info!(target: "elide", "task `{}` is up to date", task.name());
        return Ok(());
    }
    match task.run(binary)? {
        ExecOutcome::Skipped(reason) => info!(target: "elide", "skipped: {reason:?}"),
        ExecOutcome::Succeeded => {}
        ExecOutcome::Failed(failure) => info!(target: "elide", "tolerated failure: {failure}"),
    }
    Ok(())
}

fn print_version(binary: Option<&ElideCli>, stdout: &mut dyn Write) -> Result<()> {
    let Some(binary) = binary else {
        return Err(BuildError::BinaryNotFound { path: None });
    };
    let version = binary
        .get_version()
        .into_result()
        .map_err(|failure| BuildError::InvocationFailed {
            task: "version".to_owned(),
            command: format!("{} --version", binary.path().display()),
            failure,
        })?;
    writeln!(stdout, "{version}")?;
    Ok(())
}

fn current_dir() -> Result<Utf8PathBuf> {
    let dir = std::env::current_dir()?;
    Utf8PathBuf::from_path_buf(dir).map_err(|path| BuildError::Config {
        path,
        reason: "the project directory path is not valid UTF-8; pass --project-dir".to_owned(),
    })
}

fn write_line(stream: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stream, "{message}").is_err() {
        // Nothing left to report to.
    }
}
