//! svckit client binary: `svckit-cli [--url URL] <get|put|version>`.

use std::process::ExitCode;

use svckit::lifecycle::signals::shutdown_token;

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args_os()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let env: Vec<String> = std::env::vars_os()
        .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
        .collect();

    let token = match shutdown_token() {
        Ok(token) => token,
        Err(e) => {
            eprintln!("installing signal handlers: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = svckit::cli::run(
        token,
        std::io::stderr,
        tokio::io::stdin(),
        tokio::io::stdout(),
        &args,
        &env,
    )
    .await;

    if let Err(e) = result {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
