use std::process::ExitCode;

fn main() -> ExitCode {
    memref::run_cli()
}
