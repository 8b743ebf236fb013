//! Contains the command line interface for the simulator.

use clap::Parser;

/// The command line interface for the simulator.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct SimulatorCli {
    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// The subcommands for the simulator.
#[derive(Clone, Debug, Parser)]
pub enum Commands {
    /// Runs the transfers of a config file and prints the outcome.
    Start(StartArgs),
}

/// The arguments for the start subcommand.
#[derive(Clone, Debug, Parser)]
pub struct StartArgs {
    /// Path to the JSON config file.
    #[clap(long)]
    pub config: String,
}
