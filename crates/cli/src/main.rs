use std::process::ExitCode;

fn main() -> ExitCode {
    packslip_cli::run()
}
