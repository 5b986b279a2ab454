use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use dancherlink_tools::{env, icons, util};

#[derive(Parser, Debug)]
#[command(
    name = "update-icons",
    author,
    version,
    about = "Regenerate the DancherLink icon assets from a single source image",
    after_help = "Example: update-icons ../../DancherLink.png"
)]
struct Cli {
    /// Image every icon is derived from.
    #[arg(value_name = "PATH_TO_SOURCE_IMAGE")]
    source: PathBuf,
    /// Repository root holding app/; defaults to two levels above this executable.
    #[arg(long, value_name = "DIR")]
    project_root: Option<PathBuf>,
}

fn main() -> ExitCode {
    util::init_logging();

    let cli = match util::parse_args::<Cli>() {
        Ok(cli) => cli,
        Err(code) => return code,
    };

    let project_root = cli.project_root.unwrap_or_else(env::default_project_root);
    info!("Project root: {}", project_root.display());

    let source = match icons::load_source(&cli.source) {
        Ok(source) => source,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let assets = icons::standard_assets(&project_root);
    let reports = icons::regenerate(&source, &assets);
    let failed = reports.iter().filter(|report| !report.succeeded()).count();
    if failed > 0 {
        warn!("icons: {failed} of {} assets could not be updated", reports.len());
    }
    ExitCode::SUCCESS
}
