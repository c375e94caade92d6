mod cli;

use std::fs;
use std::io::{self, Read};

use clap::Parser;
use disk_shell::Shell;
use partition::Session;

pub use self::cli::Cli;

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let script = match &cli.script {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut script = String::new();
            io::stdin().read_to_string(&mut script)?;
            script
        }
    };
    log::info!("tenant={:?} script={:?}", cli.tenant, cli.script);

    let shell = Shell::new(Session::new(cli.tenant));
    print!("{}", shell.run(&script));

    Ok(())
}
