//! `ociwin-hydrate` — pulls a Windows container image from a registry into an on-disk OCI
//! image layout, optionally packaged as a tgz.
//!
//! Grounded on `original_source/cmd/hydrate/main.go` for flag names and error-reporting shape.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ociwin::error::Error;
use ociwin::hydrate::{self, Config};
use ociwin::registry::RegistryEndpoints;

#[derive(Parser)]
#[command(name = "ociwin-hydrate", about = "Hydrate a Windows container image from a registry")]
struct Args {
    /// Output directory for the downloaded image. Defaults to the system temp dir.
    #[arg(long = "outputDir")]
    output_dir: Option<PathBuf>,

    /// Name of the image to download, as `namespace/repo`.
    #[arg(long = "image", default_value = "")]
    image: String,

    /// Image tag to download.
    #[arg(long = "tag", default_value = "latest")]
    tag: String,

    /// Do not output the image as a tarball; leave the OCI layout directly in `outputDir`.
    #[arg(long = "noTarball", default_value_t = false)]
    no_tarball: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if let Err(err) = run(args).await {
        eprintln!("ERROR: {err}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn run(args: Args) -> Result<(), Error> {
    if args.image.is_empty() {
        return Err(Error::InvalidArgument("No image name provided".to_string()));
    }

    let output_dir = args.output_dir.unwrap_or_else(std::env::temp_dir);

    let tgz_path = hydrate::run(Config {
        output_dir,
        image_name: args.image,
        image_tag: args.tag,
        no_tarball: args.no_tarball,
        endpoints: RegistryEndpoints::from_env(),
    })
    .await?;

    tracing::info!(path = %tgz_path.display(), "hydration complete");
    Ok(())
}
