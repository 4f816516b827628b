//! Pipeline tests against a recording in-process runtime.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use mar::{
    ApplicationExecutor, ContainerRuntime, DependencyVerifier, ImageReference, Invocation,
    ManifestFetcher, OutputMode, Pipeline, RunSpec, RunnerConfig, Stage,
};
use mar_common::{MarError, MarResult};
use tempfile::TempDir;

const EXPORT_DIR: &str = "/export";
const VALID_APP: &str = r#"{"input":{"path":"/in"},"output":{"path":"/out"}}"#;

/// Runtime double that records every call and plays back canned results.
struct FakeRuntime {
    installed: bool,
    image_present: bool,
    pull_code: i32,
    export_code: i32,
    app_json: String,
    app_code: i32,
    inspects: Mutex<usize>,
    pulls: Mutex<Vec<OutputMode>>,
    runs: Mutex<Vec<RunSpec>>,
    export_dirs: Mutex<Vec<PathBuf>>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self {
            installed: true,
            image_present: true,
            pull_code: 0,
            export_code: 0,
            app_json: VALID_APP.to_string(),
            app_code: 0,
            inspects: Mutex::new(0),
            pulls: Mutex::new(Vec::new()),
            runs: Mutex::new(Vec::new()),
            export_dirs: Mutex::new(Vec::new()),
        }
    }
}

impl FakeRuntime {
    fn runs(&self) -> Vec<RunSpec> {
        self.runs.lock().unwrap().clone()
    }

    fn export_dirs(&self) -> Vec<PathBuf> {
        self.export_dirs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    fn program(&self) -> &str {
        "fake-docker"
    }

    fn is_installed(&self) -> bool {
        self.installed
    }

    async fn image_exists(&self, _image: &ImageReference) -> MarResult<bool> {
        *self.inspects.lock().unwrap() += 1;
        Ok(self.image_present)
    }

    async fn pull(&self, _image: &ImageReference, output: OutputMode) -> MarResult<i32> {
        self.pulls.lock().unwrap().push(output);
        Ok(self.pull_code)
    }

    async fn run(&self, spec: &RunSpec) -> MarResult<i32> {
        self.runs.lock().unwrap().push(spec.clone());

        let export = spec.mounts.iter().find(|m| m.container() == EXPORT_DIR);
        let Some(export) = export else {
            return Ok(self.app_code);
        };

        let host = export.host().to_path_buf();
        assert!(host.is_dir(), "export directory must exist during the run");
        self.export_dirs.lock().unwrap().push(host.clone());

        // Files are written even on failure to prove they are not read.
        std::fs::write(host.join("app.json"), &self.app_json)?;
        std::fs::write(host.join("pkg.json"), r#"{"name":"seg-app","version":"1.0"}"#)?;
        Ok(self.export_code)
    }
}

fn config() -> RunnerConfig {
    RunnerConfig::default().with_export_dir(EXPORT_DIR)
}

fn image() -> ImageReference {
    ImageReference::parse("seg-app:1.0").unwrap()
}

struct Dirs {
    _root: TempDir,
    input: PathBuf,
    output: PathBuf,
}

fn dirs() -> Dirs {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("in");
    let output = root.path().join("out");
    std::fs::create_dir(&input).unwrap();
    std::fs::create_dir(&output).unwrap();
    Dirs {
        input: input.canonicalize().unwrap(),
        output: output.canonicalize().unwrap(),
        _root: root,
    }
}

fn invocation(dirs: &Dirs) -> Invocation {
    Invocation {
        image: image(),
        input_dir: dirs.input.clone(),
        output_dir: dirs.output.clone(),
    }
}

fn mount_pairs(spec: &RunSpec) -> Vec<(PathBuf, String)> {
    spec.mounts
        .iter()
        .map(|m| (m.host().to_path_buf(), m.container().to_string()))
        .collect()
}

#[tokio::test]
async fn verify_fails_without_runtime() {
    let runtime = FakeRuntime {
        installed: false,
        ..FakeRuntime::default()
    };
    let config = config();

    let verifier = DependencyVerifier::new(&runtime, &config);
    assert!(!verifier.verify(&image()).await);
    assert_eq!(*runtime.inspects.lock().unwrap(), 0);
    assert!(runtime.pulls.lock().unwrap().is_empty());
    assert!(runtime.runs().is_empty());
}

#[tokio::test]
async fn verify_fails_when_image_cannot_be_pulled() {
    let runtime = FakeRuntime {
        image_present: false,
        pull_code: 1,
        ..FakeRuntime::default()
    };
    let config = config();

    let err = DependencyVerifier::new(&runtime, &config)
        .check(&image())
        .await
        .unwrap_err();
    assert!(matches!(err, MarError::ImageUnavailable { .. }));
    assert_eq!(runtime.pulls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn verify_pulls_missing_image_once() {
    let runtime = FakeRuntime {
        image_present: false,
        ..FakeRuntime::default()
    };
    let config = config().with_quiet(true);

    assert!(DependencyVerifier::new(&runtime, &config).verify(&image()).await);
    assert_eq!(*runtime.pulls.lock().unwrap(), vec![OutputMode::Discard]);
}

#[tokio::test]
async fn verify_skips_pull_for_local_image() {
    let runtime = FakeRuntime::default();
    let config = config();

    assert!(DependencyVerifier::new(&runtime, &config).verify(&image()).await);
    assert_eq!(*runtime.inspects.lock().unwrap(), 1);
    assert!(runtime.pulls.lock().unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn fetch_parses_manifest_and_removes_export_dir() {
    let runtime = FakeRuntime::default();
    let config = config();

    let manifest = ManifestFetcher::new(&runtime, &config)
        .fetch(&image())
        .await
        .unwrap();
    assert_eq!(manifest.input_path(), "/in");
    assert_eq!(manifest.output_path(), "/out");

    let runs = runtime.runs();
    assert_eq!(runs.len(), 1);
    assert!(!runs[0].tty && !runs[0].interactive);

    let exported = runtime.export_dirs();
    assert_eq!(exported.len(), 1);
    assert!(!exported[0].exists());
}

#[tokio::test]
async fn fetch_removes_export_dir_on_parse_failure() {
    let runtime = FakeRuntime {
        app_json: "{ this is not json".to_string(),
        ..FakeRuntime::default()
    };
    let config = config();

    let err = ManifestFetcher::new(&runtime, &config)
        .fetch(&image())
        .await
        .unwrap_err();
    assert!(matches!(err, MarError::ManifestFormat { .. }));
    assert!(!runtime.export_dirs()[0].exists());
}

#[tokio::test]
async fn fetch_returns_exit_code_without_reading_files() {
    let runtime = FakeRuntime {
        export_code: 1,
        app_json: "{ malformed".to_string(),
        ..FakeRuntime::default()
    };
    let config = config();

    let err = ManifestFetcher::new(&runtime, &config)
        .fetch(&image())
        .await
        .unwrap_err();
    assert!(matches!(err, MarError::ManifestExport { code: 1, .. }));
    assert_eq!(err.exit_code(), Some(1));
    assert!(!runtime.export_dirs()[0].exists());
}

#[tokio::test]
async fn fetch_twice_is_independent() {
    let runtime = FakeRuntime::default();
    let config = config();
    let fetcher = ManifestFetcher::new(&runtime, &config);

    let first = fetcher.fetch(&image()).await.unwrap();
    let second = fetcher.fetch(&image()).await.unwrap();
    assert_eq!(first, second);

    let exported = runtime.export_dirs();
    assert_eq!(exported.len(), 2);
    assert_ne!(exported[0], exported[1]);
    assert!(exported.iter().all(|dir| !dir.exists()));
}

#[tokio::test]
async fn quiet_mode_keeps_exit_code() {
    let dirs = dirs();
    let manifest = mar::ApplicationManifest::from_json(VALID_APP).unwrap();

    for quiet in [false, true] {
        let runtime = FakeRuntime {
            app_code: 3,
            ..FakeRuntime::default()
        };
        let config = config().with_quiet(quiet);

        let code = ApplicationExecutor::new(&runtime, &config)
            .run(&image(), &dirs.input, &dirs.output, &manifest)
            .await
            .unwrap();
        assert_eq!(code, 3);

        let runs = runtime.runs();
        let run = &runs[0];
        let expected = if quiet {
            OutputMode::Discard
        } else {
            OutputMode::Inherit
        };
        assert_eq!(run.output, expected);
        if quiet {
            assert!(!run.tty);
        }
    }
}

#[test_log::test(tokio::test)]
async fn scenario_a_binds_directories_and_succeeds() {
    let dirs = dirs();
    let runtime = FakeRuntime::default();
    let config = config();

    let mut pipeline = Pipeline::new(&runtime, &config);
    pipeline.run(&invocation(&dirs)).await.unwrap();
    assert_eq!(pipeline.stage(), Stage::Executed);

    let runs = runtime.runs();
    assert_eq!(runs.len(), 2);
    assert_eq!(
        mount_pairs(&runs[1]),
        vec![
            (dirs.input.clone(), "/in".to_string()),
            (dirs.output.clone(), "/out".to_string()),
        ]
    );
    assert_eq!(runs[1].image.as_str(), "seg-app:1.0");
    assert_ne!(runs[0].name, runs[1].name);
}

#[tokio::test]
async fn scenario_b_missing_runtime_aborts_before_any_run() {
    let dirs = dirs();
    let runtime = FakeRuntime {
        installed: false,
        ..FakeRuntime::default()
    };
    let config = config();

    let mut pipeline = Pipeline::new(&runtime, &config);
    let err = pipeline.run(&invocation(&dirs)).await.unwrap_err();
    assert!(matches!(err, MarError::RuntimeNotInstalled { .. }));
    assert_eq!(pipeline.stage(), Stage::Failed);
    assert!(runtime.runs().is_empty());
}

#[tokio::test]
async fn unavailable_image_skips_manifest_fetch() {
    let dirs = dirs();
    let runtime = FakeRuntime {
        image_present: false,
        pull_code: 125,
        ..FakeRuntime::default()
    };
    let config = config();

    let mut pipeline = Pipeline::new(&runtime, &config);
    let err = pipeline.run(&invocation(&dirs)).await.unwrap_err();
    assert!(matches!(err, MarError::ImageUnavailable { .. }));
    assert!(runtime.runs().is_empty());
}

#[tokio::test]
async fn scenario_c_failed_export_skips_application() {
    let dirs = dirs();
    let runtime = FakeRuntime {
        export_code: 1,
        ..FakeRuntime::default()
    };
    let config = config();

    let mut pipeline = Pipeline::new(&runtime, &config);
    let err = pipeline.run(&invocation(&dirs)).await.unwrap_err();
    assert!(matches!(err, MarError::ManifestExport { code: 1, .. }));
    assert_eq!(pipeline.stage(), Stage::Failed);
    assert_eq!(runtime.runs().len(), 1);
}

#[tokio::test]
async fn scenario_d_missing_output_path_is_a_format_error() {
    let dirs = dirs();
    let runtime = FakeRuntime {
        app_json: r#"{"input":{"path":"/in"},"output":{}}"#.to_string(),
        ..FakeRuntime::default()
    };
    let config = config();

    let mut pipeline = Pipeline::new(&runtime, &config);
    let err = pipeline.run(&invocation(&dirs)).await.unwrap_err();
    assert!(matches!(err, MarError::ManifestFormat { .. }));
    assert_eq!(runtime.runs().len(), 1);
}

#[tokio::test]
async fn missing_input_path_is_a_format_error() {
    let dirs = dirs();

    for app_json in [
        r#"{"output":{"path":"/out"}}"#,
        r#"{"input":{},"output":{"path":"/out"}}"#,
    ] {
        let runtime = FakeRuntime {
            app_json: app_json.to_string(),
            ..FakeRuntime::default()
        };
        let config = config();

        let mut pipeline = Pipeline::new(&runtime, &config);
        let err = pipeline.run(&invocation(&dirs)).await.unwrap_err();
        assert!(matches!(err, MarError::ManifestFormat { .. }), "{app_json}");
        assert_eq!(pipeline.stage(), Stage::Failed);
        assert_eq!(runtime.runs().len(), 1);
    }
}

#[tokio::test]
async fn loosely_typed_informational_fields_still_run() {
    let dirs = dirs();
    let runtime = FakeRuntime {
        app_json: r#"{"environment":null,"timeout":1.5,"input":{"path":"/in"},"output":{"path":"/out"}}"#
            .to_string(),
        ..FakeRuntime::default()
    };
    let config = config();

    let mut pipeline = Pipeline::new(&runtime, &config);
    pipeline.run(&invocation(&dirs)).await.unwrap();
    assert_eq!(pipeline.stage(), Stage::Executed);
    assert_eq!(runtime.runs().len(), 2);
}

#[tokio::test]
async fn application_failure_names_the_package() {
    let dirs = dirs();
    let runtime = FakeRuntime {
        app_code: 2,
        ..FakeRuntime::default()
    };
    let config = config();

    let mut pipeline = Pipeline::new(&runtime, &config);
    let err = pipeline.run(&invocation(&dirs)).await.unwrap_err();
    assert!(matches!(err, MarError::ApplicationFailed { code: 2, .. }));
    assert!(err.to_string().contains("seg-app:1.0"));
    assert_eq!(runtime.runs().len(), 2);
}

#[tokio::test]
async fn relative_directories_are_rejected_before_running() {
    let runtime = FakeRuntime::default();
    let config = config();
    let manifest = mar::ApplicationManifest::from_json(VALID_APP).unwrap();

    let err = ApplicationExecutor::new(&runtime, &config)
        .run(&image(), Path::new("in"), Path::new("/out"), &manifest)
        .await
        .unwrap_err();
    assert!(matches!(err, MarError::InvalidMount { .. }));
    assert!(runtime.runs().is_empty());
}
