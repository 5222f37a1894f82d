use std::process;

fn main() {
    process::exit(devflow::cli::run());
}
