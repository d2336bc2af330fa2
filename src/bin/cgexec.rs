use std::process::ExitCode;

fn main() -> ExitCode {
    match cgexec::cli::run() {
        Ok(outcome) => ExitCode::from(outcome.exit_code() as u8),
        Err(e) => {
            eprintln!("cgexec: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
