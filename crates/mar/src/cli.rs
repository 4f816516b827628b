//! MAR command line.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use mar_common::MarResult;

use crate::config::{DEFAULT_RUNTIME, RunnerConfig};
use crate::pipeline::{Invocation, Pipeline};
use crate::reference::ImageReference;
use crate::runtime::CliRuntime;

/// MAR - Application package runner
#[derive(Parser, Debug)]
#[command(name = "mar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Application package image name
    #[arg(value_name = "map-image[:tag]", value_parser = ImageReference::parse)]
    pub image: ImageReference,

    /// Input directory path
    #[arg(value_name = "input_dir", value_parser = valid_dir_path)]
    pub input_dir: PathBuf,

    /// Output directory path
    #[arg(value_name = "output_dir", value_parser = valid_dir_path)]
    pub output_dir: PathBuf,

    /// Verbose mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Execute the package quietly without printing container logs onto console
    #[arg(short, long)]
    pub quiet: bool,

    /// Container runtime binary
    #[arg(long, env = "MAR_RUNTIME", default_value = DEFAULT_RUNTIME)]
    pub runtime: String,

    /// Kill a container run that exceeds this many seconds
    #[arg(
        long,
        env = "MAR_TIMEOUT",
        value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Default log directive for the chosen verbosity.
    #[must_use]
    pub const fn log_directive(&self) -> &'static str {
        if self.verbose { "mar=debug" } else { "mar=info" }
    }

    /// Run-scoped configuration derived from the flags.
    #[must_use]
    pub fn config(&self) -> RunnerConfig {
        RunnerConfig::default()
            .with_runtime(&self.runtime)
            .with_verbose(self.verbose)
            .with_quiet(self.quiet)
            .with_timeout(self.timeout.map(Duration::from_secs))
    }

    /// The launch request described by the positional arguments.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation {
            image: self.image.clone(),
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    /// Execute the launcher pipeline.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing stage.
    pub async fn execute(self) -> MarResult<()> {
        let config = self.config();
        let runtime = CliRuntime::new(&config.runtime);
        let mut pipeline = Pipeline::new(&runtime, &config);

        pipeline.run(&self.invocation()).await?;
        tracing::info!(image = %self.image, "Application package completed");
        Ok(())
    }
}

/// Accept an existing directory, returning its absolute path.
fn valid_dir_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if !path.is_dir() {
        return Err(format!("'{value}' is not a valid directory path"));
    }
    path.canonicalize()
        .map_err(|e| format!("'{value}' cannot be resolved: {e}"))
}
