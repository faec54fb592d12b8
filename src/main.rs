use clap::Parser;
use satpg::cmd::{Cli, Commands};

fn main() {
    let _ = env_logger::builder().try_init();
    let cli = Cli::parse();

    let res = match cli.command {
        Commands::Show(a) => a.run(),
        Commands::Fsim(a) => a.run(),
        Commands::Atpg(a) => a.run(),
    };
    if let Err(e) = res {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
