//! `routetypes` binary.

fn main() {
    let args: Vec<String> = std::env::args().collect();
    std::process::exit(routetypes_cli::run(args));
}
