use clap::Parser;
use ibc_eureka_simulator::{
    cli::{Commands, SimulatorCli},
    config::SimulatorConfig,
    observability::init_subscriber,
    scenario::run,
};
use tracing::info;

fn main() -> anyhow::Result<()> {
    let cli = SimulatorCli::parse();
    match cli.command {
        Commands::Start(args) => {
            let config = SimulatorConfig::from_file(&args.config)?;

            init_subscriber(config.log_level())?;
            info!("Tracing initialized with level: {}", config.log_level());

            let report = run(&config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}
