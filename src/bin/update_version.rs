use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use dancherlink_tools::manifest::{self, UpdateRequest};
use dancherlink_tools::{env, util};

#[derive(Parser, Debug)]
#[command(
    name = "update-version",
    author,
    version,
    about = "Point the Windows entry of the update manifest at a new build"
)]
struct Cli {
    /// Version string published to clients, e.g. 2.0.0.
    #[arg(value_name = "VERSION", allow_hyphen_values = true)]
    release_version: String,
    /// Build architecture; `x64` is recorded as `x86_64` in the manifest.
    #[arg(allow_hyphen_values = true)]
    arch: String,
    /// Build configuration that produced the installer, e.g. release.
    #[arg(allow_hyphen_values = true)]
    build_config: String,
    /// Manifest to patch instead of the updates.json next to this executable.
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,
}

fn main() -> ExitCode {
    util::init_logging();

    let cli = match util::parse_args::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    let path = cli.manifest.unwrap_or_else(env::default_manifest_path);
    let request = UpdateRequest::new(cli.release_version, cli.arch, cli.build_config);
    match manifest::update_manifest(&path, &request) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
