use std::process;

fn main() {
    process::exit(conncheck::cli::run());
}
