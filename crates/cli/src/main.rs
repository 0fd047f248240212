use std::process::ExitCode;

fn main() -> ExitCode {
    fieldforce_cli::run()
}
