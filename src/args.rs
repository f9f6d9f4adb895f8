use clap::{Parser, Subcommand};

/// Data service for the virtual classroom.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, global = true, takes_value = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Runs the HTTP service (opinion votes, datasets and rankings).
    Serve(ServeArgs),
    /// Ranks the countries of a summary file by composite score.
    Rank(RankArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeArgs {
    /// (file path, optional) The JSON configuration file. Relative paths inside it are
    /// resolved against its directory.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (default 127.0.0.1) The address to listen on. Overrides the configuration file.
    #[clap(long, value_parser)]
    pub host: Option<String>,

    /// (default 8080) The port to listen on. Overrides the configuration file.
    #[clap(short, long, value_parser)]
    pub port: Option<u16>,

    /// (file path) The CSV file where the opinion votes are appended. Overrides the
    /// configuration file.
    #[clap(short, long, value_parser)]
    pub ledger: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RankArgs {
    /// (file path) The country summary CSV file
    /// (country,math_score,ESCS,HISEI,HISCED,sense_of_belonging,bullying,feeling_safe).
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (file path) A reference file containing the expected ranking in JSON format. If provided,
    /// the command fails when the computed ranking differs from the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) Where to write the ranking summary in JSON format.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, optional) The JSON configuration file, for the scoring options.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
}
