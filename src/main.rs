/*
 * main.rs
 *
 * Parse args, call the supervisor, exit with its code. Boring on purpose.
 * The interesting stuff is in supervisor.rs and launcher.rs.
 *
 * Our own failures print "ERROR: <msg>" and exit 127, before anything
 * is spawned.
 */

use clap::Parser;
use clap::error::ErrorKind;

use run_fast_or_hide::args::{Args, summarize_parse_error};
use run_fast_or_hide::error::exit_codes;
use run_fast_or_hide::supervise;

fn main() {
    std::process::exit(i32::from(run_main()));
}

fn run_main() -> u8 {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return exit_codes::SUCCESS;
        }
        Err(e) => {
            eprintln!("ERROR: {}", summarize_parse_error(&e));
            return exit_codes::FAILURE;
        }
    };

    init_logging();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return e.exit_code();
        }
    };

    match supervise(&config) {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            eprintln!("ERROR: {e}");
            e.exit_code()
        }
    }
}

/*
 * warn unless RUST_LOG says otherwise. Not tied to --verbose: with -v the
 * child's stderr is the caller's, and our chatter must not land in it.
 */
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();
}
