use std::io;
use std::process::ExitCode;

use clap::Parser;
use nix::errno::Errno;
use tmcctl::{parse_error_message, requests_version, run, version_text, Cli, Outcome};
use tracing::debug;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(_) if requests_version(std::env::args_os().skip(1)) => {
            print!("{}", version_text());
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("Error: {}.", parse_error_message(&err));
            eprintln!("Try '--help' for more information.");
            return exit_code(Errno::EINVAL as i32);
        }
    };

    if cli.version {
        print!("{}", version_text());
        return ExitCode::SUCCESS;
    }

    init_tracing(cli.debug);

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}.");
            eprintln!("Try '--help' for more information.");
            return exit_code(err.exit_code());
        }
    };

    if config.debug {
        print!("{config}");
    }

    match run(&config, &mut io::stdout().lock()) {
        Ok(Outcome::ReadFailed(err)) => {
            debug!(?err, "reply could not be read");
            eprintln!("{err}");
            ExitCode::SUCCESS
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            debug!(?err, "session failed");
            eprintln!("{err}");
            exit_code(err.exit_code())
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
