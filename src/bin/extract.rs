//! `ociwin-extract` — unpacks a downloaded OCI image tarball into chained layer directories.
//!
//! Grounded on `original_source/cmd/extract/main.go`: stage the tarball into a scratch
//! directory, read it as an OCI layout, extract every layer beneath the output directory, and
//! print the top layer's absolute path.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use ociwin::compress;
use ociwin::error::Error;
use ociwin::extract;
use ociwin::layer::sink::FsLayerWriterBackend;

#[derive(Parser)]
#[command(name = "ociwin-extract", about = "Extract an OCI image tarball into chained layer directories")]
struct Args {
    /// Path to the downloaded OCI image tarball.
    rootfs_tarball: PathBuf,

    /// Directory to materialize layer directories beneath.
    output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parsed by hand rather than `Args::parse()` so a missing/extra positional gets our own
    // usage message and exit code 1 instead of clap's default (exit code 2). `--help`/`--version`
    // still behave as clap normally handles them.
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            print!("{err}");
            return ExitCode::SUCCESS;
        }
        Err(_) => {
            eprintln!("ERROR: Invalid arguments, usage: ociwin-extract <rootfs-tarball> <output-dir>");
            return ExitCode::FAILURE;
        }
    };

    match run(args).await {
        Ok(top_layer_path) => {
            println!("{}", top_layer_path.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("ERROR: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<PathBuf, Error> {
    let staging_dir = tempfile::Builder::new()
        .prefix("ociwin-extract-")
        .tempdir()?;

    let rootfs_tarball = args.rootfs_tarball.clone();
    let staging_path = staging_dir.path().to_path_buf();
    tokio::task::spawn_blocking(move || compress::extract_tgz(&rootfs_tarball, &staging_path))
        .await
        .expect("tgz staging task panicked")?;

    tokio::fs::create_dir_all(&args.output_dir).await?;

    extract::run(staging_dir.path(), &args.output_dir, FsLayerWriterBackend).await
}
