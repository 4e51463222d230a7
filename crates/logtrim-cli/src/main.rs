//! `logtrim` entrypoint.

fn main() {
    std::process::exit(logtrim_cli::run());
}
