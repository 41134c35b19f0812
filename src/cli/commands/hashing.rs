use clap::{Arg, Command};

pub const ARG_HASH_ITERATIONS: &str = "hash-iterations";
pub const ARG_HASH_DIGEST: &str = "hash-digest";
pub const ARG_MIGRATION_TIMEOUT_SECONDS: &str = "migration-timeout-seconds";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HASH_ITERATIONS)
                .long(ARG_HASH_ITERATIONS)
                .help("PBKDF2 iteration count for newly hashed credentials")
                .env("KEYWARD_HASH_ITERATIONS")
                .default_value("200000")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new(ARG_HASH_DIGEST)
                .long(ARG_HASH_DIGEST)
                .help("PBKDF2 digest for newly hashed credentials")
                .env("KEYWARD_HASH_DIGEST")
                .default_value("sha256")
                .value_parser(["sha256", "sha384", "sha512"]),
        )
        .arg(
            Arg::new(ARG_MIGRATION_TIMEOUT_SECONDS)
                .long(ARG_MIGRATION_TIMEOUT_SECONDS)
                .help("Upper bound for the background write that upgrades a legacy credential")
                .env("KEYWARD_MIGRATION_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
