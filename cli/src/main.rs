mod commands;
mod terminal;

use commands::{CommandLine, Commands, interfaces, scan};
use quietmap_common::config::Config;
use terminal::print;

use crate::terminal::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    logging::init_logging();

    let output = commands.output_config();
    print::banner(output.no_banner, output.quiet);

    match commands.command {
        Commands::Interfaces => {
            let cfg = Config {
                output,
                ..Config::default()
            };
            interfaces::interfaces(&cfg)
        }
        Commands::Scan(args) => {
            let cfg = args.into_config(output);
            scan::scan(&cfg).await
        }
    }
}
