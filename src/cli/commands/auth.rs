use crate::secrets::{DEFAULT_SECRET_FIELD, DEFAULT_SECRET_NAME};
use clap::{Arg, ArgMatches, Command};

pub const ARG_JWT_SECRET_NAME: &str = "jwt-secret-name";
pub const ARG_JWT_SECRET_FIELD: &str = "jwt-secret-field";
pub const ARG_CORS_ORIGIN: &str = "cors-origin";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET_NAME)
                .long(ARG_JWT_SECRET_NAME)
                .help("Secret store path of the token signing secret")
                .env("AUTHGATE_JWT_SECRET_NAME")
                .default_value(DEFAULT_SECRET_NAME),
        )
        .arg(
            Arg::new(ARG_JWT_SECRET_FIELD)
                .long(ARG_JWT_SECRET_FIELD)
                .help("Field of the secret JSON holding the signing key")
                .env("AUTHGATE_JWT_SECRET_FIELD")
                .default_value(DEFAULT_SECRET_FIELD),
        )
        .arg(
            Arg::new(ARG_CORS_ORIGIN)
                .long(ARG_CORS_ORIGIN)
                .help("Browser origin allowed to call the API with credentials, example: https://app.tld")
                .env("AUTHGATE_CORS_ORIGIN"),
        )
}

#[derive(Debug)]
pub struct Options {
    pub secret_name: String,
    pub secret_field: String,
    pub cors_origin: Option<String>,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            secret_name: matches
                .get_one::<String>(ARG_JWT_SECRET_NAME)
                .cloned()
                .unwrap_or_else(|| DEFAULT_SECRET_NAME.to_string()),
            secret_field: matches
                .get_one::<String>(ARG_JWT_SECRET_FIELD)
                .cloned()
                .unwrap_or_else(|| DEFAULT_SECRET_FIELD.to_string()),
            cors_origin: matches.get_one::<String>(ARG_CORS_ORIGIN).cloned(),
        }
    }
}
