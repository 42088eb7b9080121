//! End-to-end tests for preparing a binary and running tasks with it.
#![cfg(unix)]

use camino::{Utf8Path, Utf8PathBuf};
use elide_build::config::SourceKind;
use elide_build::exec::{ExecOutcome, INSTALL_TASK, SkipReason};
use elide_build::version::VersionCheckOutcome;
use elide_build::{BuildError, BuildPipeline, InvocationResult, Settings};
use elide_installer::artefact::extraction::ZipExtractor;
use elide_installer::dirs::BaseDirs;
use elide_installer::error::InstallerError;
use elide_installer::locator::LocalBinaryLocator;
use elide_installer::permissions::is_executable;
use elide_installer::pipeline::{InstallBackends, InstallStep};
use elide_installer::platform::{Arch, Os, PlatformTag};
use elide_installer::test_utils::{StubDownloader, StubVerifier, fake_elide_script, zip_bytes};
use rstest::{fixture, rstest};
use std::path::PathBuf;
use tempfile::TempDir;

struct NoHome;

impl BaseDirs for NoHome {
    fn home_dir(&self) -> Option<PathBuf> {
        None
    }
}

struct Project {
    _tmp: TempDir,
    root: Utf8PathBuf,
}

impl Project {
    fn build_dir(&self) -> Utf8PathBuf {
        self.root.join("build")
    }

    fn download_dir(&self) -> Utf8PathBuf {
        self.build_dir()
            .join("elide-runtime")
            .join("bin")
            .join("1.0.0-linux-amd64")
    }

    fn pipeline(&self, settings: Settings) -> BuildPipeline {
        BuildPipeline::new(settings, &self.root, &self.build_dir())
            .expect("pipeline")
            .with_platform(PlatformTag::new(Os::Linux, Arch::Amd64))
            .with_locator(LocalBinaryLocator::new(None, None, &NoHome))
    }
}

#[fixture]
fn project() -> Project {
    let tmp = TempDir::new().expect("temp dir");
    let root = Utf8Path::from_path(tmp.path()).expect("utf-8 temp dir").to_path_buf();
    Project { _tmp: tmp, root }
}

fn project_settings(version: &str) -> Settings {
    let mut settings = Settings::default();
    settings.binary.source = SourceKind::Project;
    settings.binary.version = Some(version.to_owned());
    settings
}

fn release(version: &str) -> StubDownloader {
    StubDownloader::serving(zip_bytes(&[("elide", fake_elide_script(version).as_bytes())]))
}

#[rstest]
fn project_binary_is_installed_and_reports_its_version(project: Project) {
    let pipeline = project.pipeline(project_settings("1.0.0"));
    let downloader = release("1.0.0");
    let verifier = StubVerifier::accepting();
    let backends = InstallBackends {
        downloader: &downloader,
        verifier: &verifier,
        extractor: &ZipExtractor,
    };

    let prepared = pipeline.prepare_with(&backends).expect("prepare");

    let report = prepared.install.expect("install ran");
    assert_eq!(
        report.steps,
        vec![
            InstallStep::Download,
            InstallStep::Verify,
            InstallStep::Extract,
            InstallStep::MakeExecutable
        ]
    );
    assert_eq!(report.binary, project.download_dir().join("elide").into_std_path_buf());
    assert!(is_executable(&report.binary));
    assert_eq!(prepared.version, VersionCheckOutcome::Skipped);

    let cli = prepared.cli.expect("cli");
    assert!(matches!(cli.get_version(), InvocationResult::Success(ref v) if v == "1.0.0"));
    pipeline.shutdown();
}

#[rstest]
fn rejected_signature_fails_even_in_silent_mode(project: Project) {
    let mut settings = project_settings("1.0.0");
    settings.binary.silent_mode = true;
    let pipeline = project.pipeline(settings);
    let downloader = release("1.0.0");
    let verifier = StubVerifier::rejecting();
    let backends = InstallBackends {
        downloader: &downloader,
        verifier: &verifier,
        extractor: &ZipExtractor,
    };

    let err = pipeline.prepare_with(&backends).expect_err("verification failure");

    assert!(matches!(
        err,
        BuildError::Installer(InstallerError::VerificationFailed { .. })
    ));
    assert!(!project.download_dir().join("elide.zip").exists());
    assert!(!project.download_dir().join("elide").exists());
    pipeline.shutdown();
}

#[rstest]
fn local_only_without_binary_respects_silent_mode(project: Project) {
    let mut settings = Settings::default();
    settings.binary.silent_mode = true;
    let pipeline = project.pipeline(settings);
    let backends = InstallBackends {
        downloader: &release("1.0.0"),
        verifier: &StubVerifier::accepting(),
        extractor: &ZipExtractor,
    };

    let prepared = pipeline.prepare_with(&backends).expect("silent");
    assert!(prepared.cli.is_none());

    let outcome = pipeline
        .exec_task("elideRun")
        .args(["run"])
        .run(prepared.cli.as_ref())
        .expect("skipped");
    assert!(matches!(outcome, ExecOutcome::Skipped(SkipReason::BinaryAbsent)));
    pipeline.shutdown();
}

#[rstest]
fn local_only_without_binary_fails_loudly(project: Project) {
    let pipeline = project.pipeline(Settings::default());
    let backends = InstallBackends {
        downloader: &release("1.0.0"),
        verifier: &StubVerifier::accepting(),
        extractor: &ZipExtractor,
    };

    let err = pipeline.prepare_with(&backends).expect_err("no binary");

    assert!(matches!(err, BuildError::BinaryNotFound { .. }));
    pipeline.shutdown();
}

#[rstest]
fn exec_tasks_write_markers_and_report_failures(project: Project) {
    let mut settings = project_settings("1.0.0");
    settings.diagnostics.verbose = true;
    let pipeline = project.pipeline(settings);
    let downloader = release("1.0.0");
    let verifier = StubVerifier::accepting();
    let backends = InstallBackends {
        downloader: &downloader,
        verifier: &verifier,
        extractor: &ZipExtractor,
    };
    let prepared = pipeline.prepare_with(&backends).expect("prepare");
    let cli = prepared.cli.as_ref();

    let task = pipeline.exec_task("elideRun").args(["run", "main.ts"]);
    assert_eq!(task.command_line(), vec!["--verbose", "run", "main.ts"]);
    let marker = task.marker().to_path_buf();
    assert!(matches!(task.run(cli).expect("run"), ExecOutcome::Succeeded));
    assert!(
        pipeline
            .exec_task("elideRun")
            .args(["run", "main.ts"])
            .is_up_to_date(cli)
    );
    assert!(std::fs::read_to_string(marker).expect("marker").ends_with("--verbose\nrun\nmain.ts\n"));

    // The fake binary only fails when `fail` is its first argument.
    let failing = pipeline.exec_task("elideFail").verbose(false).args(["fail"]);
    let failing_marker = failing.marker().to_path_buf();
    let err = failing.run(cli).expect_err("non-zero exit");
    assert!(matches!(err, BuildError::InvocationFailed { ref task, .. } if task == "elideFail"));
    assert!(err.to_string().contains("exit code 3"));
    assert!(!failing_marker.exists());

    let tolerated = pipeline
        .exec_task("elideTolerant")
        .verbose(false)
        .args(["fail"])
        .use_invocation(|invocation| invocation.on_non_zero_exit_code(|_| {}));
    assert!(matches!(
        tolerated.run(cli).expect("custom handling"),
        ExecOutcome::Failed(_)
    ));
    pipeline.shutdown();
}

#[rstest]
fn install_task_needs_a_manifest(project: Project) {
    let pipeline = project.pipeline(project_settings("1.0.0"));
    assert!(pipeline.install_task().is_none());
    pipeline.shutdown();

    std::fs::write(project.root.join("elide.pkl"), "amends \"elide:project.pkl\"\n")
        .expect("write manifest");
    let mut settings = project_settings("1.0.0");
    settings.diagnostics.telemetry = false;
    let pipeline = project.pipeline(settings);

    let task = pipeline.install_task().expect("install task");

    assert_eq!(task.name(), INSTALL_TASK);
    assert_eq!(task.command_line(), vec!["install", "--no-telemetry"]);
    assert!(!pipeline.exec_task("elideRun").telemetry_enabled());
    pipeline.shutdown();
}

#[rstest]
fn changed_arguments_or_binary_invalidate_the_marker(project: Project) {
    let pipeline = project.pipeline(project_settings("1.0.0"));
    let downloader = release("1.0.0");
    let verifier = StubVerifier::accepting();
    let backends = InstallBackends {
        downloader: &downloader,
        verifier: &verifier,
        extractor: &ZipExtractor,
    };
    let prepared = pipeline.prepare_with(&backends).expect("prepare");
    let cli = prepared.cli.as_ref();

    let first = pipeline.exec_task("elideExec").args(["run", "a.ts"]);
    assert!(!first.is_up_to_date(cli));
    assert!(matches!(first.run(cli).expect("first run"), ExecOutcome::Succeeded));
    assert!(pipeline.exec_task("elideExec").args(["run", "a.ts"]).is_up_to_date(cli));

    let second = pipeline.exec_task("elideExec").args(["test"]);
    assert!(!second.is_up_to_date(cli));
    let (ran, seen) = std::sync::mpsc::channel();
    let second = second.use_invocation(move |invocation| {
        invocation.on_success(move |_| {
            let _ = ran.send(());
        })
    });
    assert!(matches!(second.run(cli).expect("second run"), ExecOutcome::Succeeded));
    assert!(seen.try_recv().is_ok());
    assert!(pipeline.exec_task("elideExec").args(["test"]).is_up_to_date(cli));
    assert!(!pipeline.exec_task("elideExec").args(["run", "a.ts"]).is_up_to_date(cli));

    let other_binary = project.root.join("other").join("elide");
    let other = pipeline.cli(other_binary.as_std_path());
    assert!(!pipeline.exec_task("elideExec").args(["test"]).is_up_to_date(Some(&other)));
    pipeline.shutdown();
}
