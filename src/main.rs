use std::process;

use clap::Parser;

use enumgen::cli::Args;

fn main() {
    let args = Args::parse();
    match enumgen::run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(2);
        }
    }
}
