use ltfs_reader::cli::{Cli, Commands};
use ltfs_reader::config::ReaderConfig;
use ltfs_reader::error::Result;
use ltfs_reader::{commands, logger};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse_args();

    let config = match ReaderConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    // Initialize logging system
    logger::init(args.verbose, config.log_format)?;

    debug!("ltfsread starting");

    match run(args, config).await {
        Ok(_) => {
            info!("Operation completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Operation failed: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(args: Cli, config: ReaderConfig) -> Result<()> {
    match args.command {
        Commands::Info { device } => {
            let device = config.device_path(device)?;
            commands::info::execute(device, config).await
        }

        Commands::Generations { device } => {
            let device = config.device_path(device)?;
            commands::generations::execute(device, config).await
        }

        Commands::Tree { device, path } => {
            let device = config.device_path(device)?;
            commands::tree::execute(device, path, config).await
        }

        Commands::Position { device } => {
            let device = config.device_path(device)?;
            commands::position::execute(device, config).await
        }

        Commands::Check { device } => {
            let device = config.device_path(device)?;
            commands::check::execute(device, config).await
        }

        Commands::Dump {
            device,
            partition,
            block,
            output,
            quiet,
        } => {
            let device = config.device_path(device)?;
            commands::dump::execute(device, partition, block, output, quiet, config).await
        }
    }
}
