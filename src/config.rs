//! Layered settings for the build integration.
//!
//! Values come from `elide.toml` in the project directory, with defaults for
//! everything that is missing, and are then overridden by `ELIDE_*`
//! environment variables.

use crate::error::{BuildError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use elide_installer::error::InstallerError;
use elide_installer::source::BinaryConfiguration;
use serde::Deserialize;
use std::path::PathBuf;

/// File name of the project settings.
pub const SETTINGS_FILE: &str = "elide.toml";

/// Explicit binary path, consulted before any search.
pub const ENV_BIN_PATH: &str = "ELIDE_BIN_PATH";
/// Required Elide version.
pub const ENV_BIN_VERSION: &str = "ELIDE_BIN_VERSION";
/// Strict version checking toggle.
pub const ENV_STRICT_VERSION_CHECK: &str = "ELIDE_BIN_STRICT_VERSION_CHECK";
/// Silent mode toggle.
pub const ENV_SILENT_MODE: &str = "ELIDE_BIN_SILENT_MODE";
/// `--debug` toggle.
pub const ENV_DEBUG: &str = "ELIDE_DIAGNOSTICS_DEBUG";
/// `--verbose` toggle.
pub const ENV_VERBOSE: &str = "ELIDE_DIAGNOSTICS_VERBOSE";
/// Telemetry toggle.
pub const ENV_TELEMETRY: &str = "ELIDE_DIAGNOSTICS_TELEMETRY";

/// All settings for one project.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Which binary to use and how strictly to check it.
    pub binary: BinarySettings,
    /// Flags passed to every invocation.
    pub diagnostics: DiagnosticsSettings,
    /// Optional tasks.
    pub features: FeatureSettings,
}

/// How the binary is resolved, as written in `elide.toml`.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// Only a binary installed on this machine.
    #[default]
    LocalOnly,
    /// A local binary when present, a download otherwise.
    LocalIfApplicable,
    /// Always a project-scoped download.
    Project,
}

/// The `[binary]` table.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct BinarySettings {
    /// Resolution strategy.
    pub source: SourceKind,
    /// Directory holding a local-only binary.
    pub path: Option<PathBuf>,
    /// Directory receiving a downloaded binary.
    pub download_path: Option<PathBuf>,
    /// Pinned version.
    pub version: Option<String>,
    /// Fail when a local binary reports another version.
    pub strict_version_check: bool,
    /// Skip tasks instead of failing when no binary exists.
    pub silent_mode: bool,
    /// Explicit binary from `ELIDE_BIN_PATH`.
    #[serde(skip)]
    pub override_path: Option<PathBuf>,
}

/// The `[diagnostics]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsSettings {
    /// Pass `--debug`.
    pub debug: bool,
    /// Pass `--verbose`.
    pub verbose: bool,
    /// Leave telemetry on.
    #[serde(default = "DiagnosticsSettings::default_telemetry")]
    pub telemetry: bool,
}

impl DiagnosticsSettings {
    const fn default_telemetry() -> bool {
        true
    }
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        Self {
            debug: false,
            verbose: false,
            telemetry: Self::default_telemetry(),
        }
    }
}

/// The `[features]` table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FeatureSettings {
    /// Run `elide install` when the manifest exists.
    #[serde(default = "FeatureSettings::default_enable_install")]
    pub enable_install: bool,
    /// Project manifest, relative to the project directory.
    #[serde(default = "FeatureSettings::default_manifest")]
    pub manifest: String,
}

impl FeatureSettings {
    const fn default_enable_install() -> bool {
        true
    }

    fn default_manifest() -> String {
        "elide.pkl".to_owned()
    }
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            enable_install: Self::default_enable_install(),
            manifest: Self::default_manifest(),
        }
    }
}

impl Settings {
    /// Load `elide.toml` from `project_dir` and apply environment overrides.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] for unreadable or invalid files and
    /// [`BuildError::InvalidEnv`] for malformed boolean overrides.
    pub fn load(project_dir: &Utf8Path) -> Result<Self> {
        let path = project_dir.join(SETTINGS_FILE);
        let mut settings = if path.is_file() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        settings.apply_env(|var| std::env::var(var).ok())?;
        Ok(settings)
    }

    /// Parse a settings file without consulting the environment.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] when the file cannot be read or parsed.
    pub fn from_file(path: &Utf8Path) -> Result<Self> {
        let config_error = |reason: String| BuildError::Config {
            path: path.as_std_path().to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|err| config_error(err.to_string()))?;
        toml::from_str(&text).map_err(|err| config_error(err.to_string()))
    }

    /// Apply overrides from `lookup`, usually the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidEnv`] when a boolean variable is neither
    /// `true` nor `false`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_BIN_PATH).filter(|value| !value.trim().is_empty()) {
            self.binary.override_path = Some(PathBuf::from(path));
        }
        if let Some(version) = lookup(ENV_BIN_VERSION).filter(|value| !value.trim().is_empty()) {
            self.binary.version = Some(version);
        }
        let flags: [(&'static str, &mut bool); 5] = [
            (ENV_STRICT_VERSION_CHECK, &mut self.binary.strict_version_check),
            (ENV_SILENT_MODE, &mut self.binary.silent_mode),
            (ENV_DEBUG, &mut self.diagnostics.debug),
            (ENV_VERBOSE, &mut self.diagnostics.verbose),
            (ENV_TELEMETRY, &mut self.diagnostics.telemetry),
        ];
        for (var, slot) in flags {
            if let Some(value) = lookup(var) {
                *slot = parse_flag(var, &value)?;
            }
        }
        Ok(())
    }

    /// Turn the `[binary]` table into an installer configuration.
    ///
    /// # Errors
    ///
    /// Returns an installer configuration error when a downloading source
    /// has no version, or the version is blank or `latest`.
    pub fn binary_configuration(&self) -> Result<BinaryConfiguration> {
        let binary = &self.binary;
        let mut config = BinaryConfiguration::default();
        match binary.source {
            SourceKind::LocalOnly => {
                config.use_local_only(binary.path.clone());
                config.set_version(binary.version.clone());
                config.set_strict_version_check(binary.strict_version_check);
            }
            SourceKind::LocalIfApplicable => config.use_local_if_applicable(
                pinned(binary, "local-if-applicable")?,
                binary.strict_version_check,
                binary.download_path.clone(),
            )?,
            SourceKind::Project => config
                .use_project_binary(pinned(binary, "project")?, binary.download_path.clone())?,
        }
        config.set_silent_mode(binary.silent_mode);
        Ok(config)
    }

    /// Whether the install task should run for `project_dir`.
    #[must_use]
    pub fn install_enabled(&self, project_dir: &Utf8Path) -> bool {
        self.features.enable_install && project_dir.join(&self.features.manifest).is_file()
    }

    /// Resolve the build directory, defaulting to `<project>/build`.
    #[must_use]
    pub fn build_dir(project_dir: &Utf8Path, explicit: Option<Utf8PathBuf>) -> Utf8PathBuf {
        explicit.unwrap_or_else(|| project_dir.join("build"))
    }
}

fn pinned<'a>(binary: &'a BinarySettings, source_kind: &'static str) -> Result<&'a str> {
    binary
        .version
        .as_deref()
        .ok_or(BuildError::Installer(InstallerError::MissingVersion { source_kind }))
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool> {
    match value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(BuildError::InvalidEnv {
            var,
            value: value.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elide_installer::source::ResolutionSource;
    use rstest::rstest;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[rstest]
    fn defaults_use_local_binaries_with_telemetry() {
        let settings = Settings::default();

        assert_eq!(settings.binary.source, SourceKind::LocalOnly);
        assert!(settings.diagnostics.telemetry);
        assert!(settings.features.enable_install);
        assert_eq!(settings.features.manifest, "elide.pkl");
    }

    #[rstest]
    fn deserialises_every_table() {
        let source = concat!(
            "[binary]\n",
            "source = \"project\"\n",
            "version = \"1.0.0\"\n",
            "download-path = \"/cache/elide\"\n",
            "silent-mode = true\n",
            "[diagnostics]\n",
            "verbose = true\n",
            "telemetry = false\n",
            "[features]\n",
            "enable-install = false\n",
        );

        let settings = toml::from_str::<Settings>(source)
            .expect("expected configuration to parse successfully");

        assert_eq!(settings.binary.source, SourceKind::Project);
        assert_eq!(settings.binary.version.as_deref(), Some("1.0.0"));
        assert_eq!(settings.binary.download_path, Some(PathBuf::from("/cache/elide")));
        assert!(settings.binary.silent_mode);
        assert!(settings.diagnostics.verbose);
        assert!(!settings.diagnostics.telemetry);
        assert!(!settings.features.enable_install);
    }

    #[rstest]
    #[case::top_level("unexpected = true\n")]
    #[case::binary_table("[binary]\nchannel = \"nightly\"\n")]
    #[case::unknown_source("[binary]\nsource = \"anywhere\"\n")]
    fn rejects_unknown_fields(#[case] source: &str) {
        let outcome: std::result::Result<Settings, _> = toml::from_str(source);

        assert!(outcome.is_err(), "expected a parse error for {source:?}");
    }

    #[rstest]
    fn env_overrides_replace_file_values() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                (ENV_BIN_PATH, "/opt/elide/bin/elide"),
                (ENV_BIN_VERSION, "1.2.3"),
                (ENV_STRICT_VERSION_CHECK, "true"),
                (ENV_TELEMETRY, "false"),
            ]))
            .expect("valid overrides");

        assert_eq!(
            settings.binary.override_path,
            Some(PathBuf::from("/opt/elide/bin/elide"))
        );
        assert_eq!(settings.binary.version.as_deref(), Some("1.2.3"));
        assert!(settings.binary.strict_version_check);
        assert!(!settings.diagnostics.telemetry);
    }

    #[rstest]
    #[case("yes")]
    #[case("1")]
    #[case("TRUE")]
    #[case("")]
    fn boolean_overrides_are_strict(#[case] value: &str) {
        let mut settings = Settings::default();

        let err = settings
            .apply_env(env(&[(ENV_SILENT_MODE, value)]))
            .expect_err("rejected value");

        assert!(matches!(err, BuildError::InvalidEnv { var: ENV_SILENT_MODE, .. }));
    }

    #[rstest]
    fn blank_bin_path_is_ignored() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[(ENV_BIN_PATH, "  ")]))
            .expect("valid overrides");
        assert!(settings.binary.override_path.is_none());
    }

    #[rstest]
    fn blank_bin_version_keeps_the_file_version() {
        let mut settings = Settings::default();
        settings.binary.version = Some("1.0.0".to_owned());
        settings.binary.strict_version_check = true;
        settings
            .apply_env(env(&[(ENV_BIN_VERSION, "")]))
            .expect("valid overrides");

        assert_eq!(settings.binary.version.as_deref(), Some("1.0.0"));
        let config = settings.binary_configuration().expect("configuration");
        assert_eq!(config.version(), Some("1.0.0"));
    }

    #[rstest]
    fn project_source_requires_a_version() {
        let mut settings = Settings::default();
        settings.binary.source = SourceKind::Project;

        let err = settings.binary_configuration().expect_err("missing version");

        assert!(err.to_string().contains("binary.version"));
    }

    #[rstest]
    fn project_source_rejects_latest() {
        let mut settings = Settings::default();
        settings.binary.source = SourceKind::Project;
        settings.binary.version = Some("latest".to_owned());

        let err = settings.binary_configuration().expect_err("latest");

        assert!(matches!(
            err,
            BuildError::Installer(InstallerError::InvalidVersion { .. })
        ));
    }

    #[rstest]
    fn local_only_keeps_version_for_strict_checks() {
        let mut settings = Settings::default();
        settings.binary.path = Some(PathBuf::from("/opt/elide"));
        settings.binary.version = Some("1.0.0".to_owned());
        settings.binary.strict_version_check = true;

        let config = settings.binary_configuration().expect("config");

        assert_eq!(
            config.source(),
            &ResolutionSource::LocalOnly {
                path: Some(PathBuf::from("/opt/elide"))
            }
        );
        assert_eq!(config.version(), Some("1.0.0"));
        assert!(config.strict_version_check());
    }

    #[rstest]
    fn project_source_switches_strict_checking_off() {
        let mut settings = Settings::default();
        settings.binary.source = SourceKind::Project;
        settings.binary.version = Some("1.0.0".to_owned());
        settings.binary.strict_version_check = true;
        settings.binary.silent_mode = true;

        let config = settings.binary_configuration().expect("config");

        assert!(!config.strict_version_check());
        assert!(config.silent_mode());
    }

    #[rstest]
    fn install_requires_the_manifest() {
        let dir = tempfile::tempdir().expect("temp dir");
        let project = Utf8Path::from_path(dir.path()).expect("utf-8 temp dir");
        let settings = Settings::default();

        assert!(!settings.install_enabled(project));
        std::fs::write(project.join("elide.pkl"), "amends \"elide:project.pkl\"\n")
            .expect("write manifest");
        assert!(settings.install_enabled(project));
    }

    #[rstest]
    fn load_reads_the_project_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let project = Utf8Path::from_path(dir.path()).expect("utf-8 temp dir");
        std::fs::write(
            project.join(SETTINGS_FILE),
            "[binary]\nsource = \"local-if-applicable\"\nversion = \"1.0.0\"\n",
        )
        .expect("write settings");

        let settings = temp_env::with_vars_unset(
            [ENV_BIN_PATH, ENV_BIN_VERSION, ENV_SILENT_MODE],
            || Settings::load(project),
        )
        .expect("load settings");

        assert_eq!(settings.binary.source, SourceKind::LocalIfApplicable);
        assert_eq!(settings.binary.version.as_deref(), Some("1.0.0"));
    }

    #[rstest]
    fn load_reports_the_broken_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let project = Utf8Path::from_path(dir.path()).expect("utf-8 temp dir");
        std::fs::write(project.join(SETTINGS_FILE), "[binary\n").expect("write settings");

        let err = Settings::load(project).expect_err("parse error");

        assert!(matches!(err, BuildError::Config { .. }));
        assert!(err.to_string().contains(SETTINGS_FILE));
    }

    #[rstest]
    fn build_dir_defaults_inside_the_project() {
        let project = Utf8Path::new("/work/app");
        assert_eq!(Settings::build_dir(project, None), Utf8PathBuf::from("/work/app/build"));
        assert_eq!(
            Settings::build_dir(project, Some(Utf8PathBuf::from("/tmp/out"))),
            Utf8PathBuf::from("/tmp/out")
        );
    }
}
