/*
 * args.rs
 *
 * Clap derive macros handle parsing. Life's too short to do this by hand.
 *
 * trailing_var_arg grabs everything from the first positional on, so
 * `run-fast-or-hide -s 5000 grep -r foo` doesn't try to parse grep's
 * flags. `--` works too and is what the docs recommend.
 *
 * Values are taken as strings and validated in into_config, so the error
 * messages are ours ("invalid sleep time") rather than clap's.
 */

use clap::Parser;

use crate::config::{
    Config, DEFAULT_SLEEP_MICROS, Identity, parse_nice_delta, parse_sleep_micros,
};
use crate::error::{Result, SupervisorError};
use crate::identity::lookup_user;

#[derive(Parser, Debug)]
#[command(
    name = "run-fast-or-hide",
    version,
    about = "Run command and detach if it takes too long to execute",
    long_about = "Start COMMAND and wait for it, at most --sleep microseconds.\n\n\
                  If COMMAND finishes in time, exit with its exit status.\n\
                  Otherwise leave it running in the background (its standard\n\
                  streams redirected to /dev/null unless --verbose) and exit 250.",
    after_help = "Exit status:\n\
                  \x20    0 - child exited normally\n\
                  \x20  250 - child didn't exit yet\n\
                  \x20  127 - execution failed\n\
                  \x20other - exit status of the child process (it exited before timeout)\n\
                  \x20  [*] - if child exits with code 250 it is modified to 251."
)]
pub struct Args {
    /// Run as USER, chdir to its home directory.
    #[arg(short = 'u', long = "user", value_name = "USER")]
    pub user: Option<String>,

    /// Add INCR to the process's nice level.
    #[arg(
        short = 'n',
        long = "nice",
        value_name = "INCR",
        default_value = "0",
        allow_negative_numbers = true
    )]
    pub nice: String,

    /// Wait USEC microseconds before detaching (minimum 1000).
    ///
    /// Falls back to RUN_FAST_OR_HIDE_SLEEP environment variable.
    #[arg(
        short = 's',
        long = "sleep",
        value_name = "USEC",
        default_value_t = DEFAULT_SLEEP_MICROS.to_string(),
        env = "RUN_FAST_OR_HIDE_SLEEP"
    )]
    pub sleep: String,

    /// Don't redirect the command's standard input and output.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Command to run, followed by its arguments.
    #[arg(trailing_var_arg = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Args {
    /// Validate into a [`Config`], resolving `--user` from the system
    /// account database.
    ///
    /// # Errors
    ///
    /// See [`Args::into_config_with`].
    pub fn into_config(self) -> Result<Config> {
        self.into_config_with(lookup_user)
    }

    /// Validate with a caller-supplied user lookup.
    ///
    /// Checks run in this order: sleep, nice, user, command. The first
    /// failure wins.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a bad sleep/nice value or a missing command,
    /// `Identity` if the lookup fails.
    pub fn into_config_with<F>(self, lookup: F) -> Result<Config>
    where
        F: FnOnce(&str) -> Result<Identity>,
    {
        let timeout_micros = parse_sleep_micros(&self.sleep)?;
        let nice_delta = parse_nice_delta(&self.nice)?;
        let identity = self.user.as_deref().map(lookup).transpose()?;

        if self.command.is_empty() {
            return Err(SupervisorError::InvalidArgument(
                "command is missing".to_string(),
            ));
        }

        Config::new(
            self.command,
            timeout_micros,
            identity,
            nice_delta,
            self.verbose,
        )
    }
}

/* first line of a clap error, without clap's own "error: " prefix */
#[must_use]
pub fn summarize_parse_error(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let first = rendered.lines().next().unwrap_or("unknown option");
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    fn fake_user(name: &str) -> Result<Identity> {
        if name == "builder" {
            Ok(Identity {
                username: name.to_string(),
                uid: 1000,
                gid: 1000,
                home_dir: "/home/builder".to_string(),
                groups: vec![1000, 27],
            })
        } else {
            Err(SupervisorError::Identity("invalid user".to_string()))
        }
    }

    #[test]
    fn test_minimal_args() {
        let args = parse(&["run-fast-or-hide", "--", "echo", "hello"]);
        assert_eq!(args.command, ["echo", "hello"]);
        assert!(args.user.is_none());
        assert!(!args.verbose);

        let config = args.into_config_with(fake_user).unwrap();
        assert_eq!(config.timeout_micros(), DEFAULT_SLEEP_MICROS);
        assert_eq!(config.nice_delta(), 0);
    }

    #[test]
    fn test_all_options() {
        let args = parse(&[
            "run-fast-or-hide",
            "-u",
            "builder",
            "-n",
            "5",
            "-s",
            "2500",
            "-v",
            "--",
            "make",
            "-j4",
        ]);
        let config = args.into_config_with(fake_user).unwrap();
        assert_eq!(config.command(), ["make", "-j4"]);
        assert_eq!(config.timeout_micros(), 2_500);
        assert_eq!(config.nice_delta(), 5);
        assert!(config.verbose());
        let identity = config.identity().unwrap();
        assert_eq!(identity.uid, 1000);
        assert_eq!(identity.home_dir, "/home/builder");
    }

    #[test]
    fn test_long_options() {
        let args = parse(&[
            "run-fast-or-hide",
            "--user=builder",
            "--nice=-3",
            "--sleep=1000",
            "--verbose",
            "true",
        ]);
        let config = args.into_config_with(fake_user).unwrap();
        assert_eq!(config.nice_delta(), -3);
        assert_eq!(config.timeout_micros(), 1_000);
    }

    #[test]
    fn test_negative_nice_short_form() {
        let args = parse(&["run-fast-or-hide", "-n", "-5", "--", "true"]);
        assert_eq!(args.nice, "-5");
    }

    #[test]
    fn test_command_flags_not_parsed() {
        /* without --, everything after the command belongs to it */
        let args = parse(&["run-fast-or-hide", "grep", "-v", "-s", "x"]);
        assert_eq!(args.command, ["grep", "-v", "-s", "x"]);
        assert!(!args.verbose);
    }

    #[test]
    fn test_sleep_too_small() {
        let err = parse(&["run-fast-or-hide", "-s", "500", "--", "true"])
            .into_config_with(fake_user)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid sleep time");
    }

    #[test]
    fn test_unknown_user() {
        let err = parse(&["run-fast-or-hide", "-u", "ghost", "--", "true"])
            .into_config_with(fake_user)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid user");
    }

    #[test]
    fn test_missing_command() {
        let err = parse(&["run-fast-or-hide", "-s", "5000"])
            .into_config_with(fake_user)
            .unwrap_err();
        assert_eq!(err.to_string(), "command is missing");
    }

    #[test]
    fn test_sleep_checked_before_command() {
        let err = parse(&["run-fast-or-hide", "-s", "10"])
            .into_config_with(fake_user)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid sleep time");
    }

    #[test]
    fn test_bad_nice() {
        let err = parse(&["run-fast-or-hide", "-n", "lots", "--", "true"])
            .into_config_with(fake_user)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid nice level");
    }

    #[test]
    fn test_unknown_option() {
        let err = Args::try_parse_from(["run-fast-or-hide", "--frobnicate", "--", "true"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
        assert!(summarize_parse_error(&err).contains("--frobnicate"));
    }

    #[test]
    fn test_help_is_not_a_failure() {
        let err = Args::try_parse_from(["run-fast-or-hide", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }
}
