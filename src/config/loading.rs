use ::config::{Config, Environment};
use log::{debug, info};
use snafu::{ResultExt, Snafu};

use super::models::{Settings, DEFAULT_BASE_URI, DEFAULT_LOGIN_URI, DEFAULT_SOURCE};

const ENV_PREFIX: &str = "CLOUDPRINT";

/// Loads [`Settings`] from `CLOUDPRINT_*` environment variables, after
/// importing any `.env` files found by `dotenv-flow`.
///
/// `CLOUDPRINT_USERNAME` and `CLOUDPRINT_PASSWORD` are required; the service
/// addresses and source identifier have defaults.
pub fn load_config() -> Result<Settings, SettingsError> {
    // `.env`, `.env.local` and friends only fill variables not already set.
    match dotenv_flow::dotenv_flow() {
        Ok(path) => info!("Loaded dotenv file: {:?}", path),
        Err(e) => debug!("No dotenv file loaded: {e}"),
    }

    load_from_environment(environment())
}

fn environment() -> Environment {
    Environment::default()
        .prefix(ENV_PREFIX)
        .separator("_")
        .prefix_separator("_")
        .try_parsing(true)
}

fn load_from_environment(environment: Environment) -> Result<Settings, SettingsError> {
    let config = Config::builder()
        .add_source(environment)
        .set_default("source", DEFAULT_SOURCE).context(BuildSnafu)?
        .set_default("baseuri", DEFAULT_BASE_URI).context(BuildSnafu)?
        .set_default("loginuri", DEFAULT_LOGIN_URI).context(BuildSnafu)?
        .build().context(BuildSnafu)?;

    let settings: Settings = config.try_deserialize().context(DeserializeSnafu)?;
    let source = settings.source.clone();
    Ok(settings.with_source(Some(&source)))
}

// ////// //
// Errors //
// ////// //

#[derive(Debug, Snafu)]
pub enum SettingsError {
    #[snafu(display("Could not build configuration"))]
    Build { source: ::config::ConfigError },

    #[snafu(display("Invalid print service configuration"))]
    Deserialize { source: ::config::ConfigError },
}
