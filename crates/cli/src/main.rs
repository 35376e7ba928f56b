use std::process::ExitCode;

fn main() -> ExitCode {
    tempo_cli::run()
}
