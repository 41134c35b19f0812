use clap::{Arg, Command};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("HMAC secret used to sign session tokens")
                .env("KEYWARD_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Session token lifetime in seconds")
                .env("KEYWARD_TOKEN_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64).range(1..)),
        )
}
