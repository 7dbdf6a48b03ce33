use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use lettre::message::Mailbox;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroize;

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_USERNAME_VAR: &str = "TALLY_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "TALLY_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "TALLY_DB_HOSTNAME";
const DB_PORT_VAR: &str = "TALLY_DB_PORT";
const DB_NAME_VAR: &str = "TALLY_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "TALLY_DB_MAX_CONNECTIONS";

const TOKEN_SIGNING_KEY_VAR: &str = "TALLY_TOKEN_SIGNING_KEY_B64";

const EMAIL_ENABLED_VAR: &str = "TALLY_EMAIL_ENABLED";
const EMAIL_FROM_ADDR_VAR: &str = "TALLY_EMAIL_FROM_ADDR";
const EMAIL_REPLY_TO_ADDR_VAR: &str = "TALLY_EMAIL_REPLY_TO_ADDR";
const SMTP_USERNAME_VAR: &str = "TALLY_SMTP_USERNAME";
const SMTP_KEY_VAR: &str = "TALLY_SMTP_KEY";
const SMTP_ADDRESS_VAR: &str = "TALLY_SMTP_ADDRESS";
const MAX_SMTP_CONNECTIONS_VAR: &str = "TALLY_MAX_SMTP_CONNECTIONS";
const SMTP_IDLE_TIMEOUT_SECS_VAR: &str = "TALLY_SMTP_IDLE_TIMEOUT_SECS";

const PUSH_ENABLED_VAR: &str = "TALLY_PUSH_ENABLED";
const PUSH_GATEWAY_URL_VAR: &str = "TALLY_PUSH_GATEWAY_URL";
const PUSH_GATEWAY_KEY_VAR: &str = "TALLY_PUSH_GATEWAY_KEY";
const PUSH_TIMEOUT_SECS_VAR: &str = "TALLY_PUSH_TIMEOUT_SECS";

const INVITE_ACCEPT_URL_VAR: &str = "TALLY_INVITE_ACCEPT_URL";
const INVITE_LIFETIME_DAYS_VAR: &str = "TALLY_INVITE_LIFETIME_DAYS";

const HEALTH_ENDPOINT_KEY_VAR: &str = "TALLY_HEALTH_ENDPOINT_KEY";
const ACTIX_WORKER_COUNT_VAR: &str = "TALLY_ACTIX_WORKER_COUNT";
const LOG_LEVEL_VAR: &str = "TALLY_LOG_LEVEL";

const TOKEN_SIGNING_KEY_SIZE: usize = 64;

// Deployments are expected to set TALLY_TOKEN_SIGNING_KEY_B64. The compiled-in
// key exists so development environments and tests can verify tokens without
// provisioning one.
const DEV_TOKEN_SIGNING_KEY: [u8; TOKEN_SIGNING_KEY_SIZE] =
    *b"tally-development-token-signing-key-do-not-use-in-production!!!!";

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,

    pub token_signing_key: [u8; TOKEN_SIGNING_KEY_SIZE],

    #[zeroize(skip)]
    pub email_enabled: bool,
    #[zeroize(skip)]
    pub email_from_address: Mailbox,
    #[zeroize(skip)]
    pub email_reply_to_address: Mailbox,
    pub smtp_username: String,
    pub smtp_key: String,
    #[zeroize(skip)]
    pub smtp_address: String,
    #[zeroize(skip)]
    pub max_smtp_connections: u32,
    #[zeroize(skip)]
    pub smtp_idle_timeout: Duration,

    #[zeroize(skip)]
    pub push_enabled: bool,
    #[zeroize(skip)]
    pub push_gateway_url: String,
    pub push_gateway_key: String,
    #[zeroize(skip)]
    pub push_timeout: Duration,

    #[zeroize(skip)]
    pub invite_accept_url: String,
    #[zeroize(skip)]
    pub invite_lifetime: Duration,

    pub health_endpoint_key: String,
    #[zeroize(skip)]
    pub actix_worker_count: usize,
    #[zeroize(skip)]
    pub log_level: String,
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let token_signing_key = match std::env::var(TOKEN_SIGNING_KEY_VAR) {
            Ok(var) => {
                let key = b64
                    .decode(var.as_bytes())
                    .map_err(|_| ConfigError::InvalidVar(TOKEN_SIGNING_KEY_VAR))?;
                key[..]
                    .try_into()
                    .map_err(|_| ConfigError::InvalidVar(TOKEN_SIGNING_KEY_VAR))?
            }
            Err(_) => DEV_TOKEN_SIGNING_KEY,
        };

        let email_from_address: Mailbox =
            env_var_or(EMAIL_FROM_ADDR_VAR, String::from("Tally <no-reply@tally.app>"))
                .parse()
                .map_err(|_| ConfigError::InvalidVar(EMAIL_FROM_ADDR_VAR))?;
        let email_reply_to_address: Mailbox =
            env_var_or(EMAIL_REPLY_TO_ADDR_VAR, String::from("Tally <support@tally.app>"))
                .parse()
                .map_err(|_| ConfigError::InvalidVar(EMAIL_REPLY_TO_ADDR_VAR))?;

        let inner = ConfigInner {
            db_username: env_var(DB_USERNAME_VAR)?,
            db_password: env_var(DB_PASSWORD_VAR)?,
            db_hostname: env_var(DB_HOSTNAME_VAR)?,
            db_port: env_var(DB_PORT_VAR)?,
            db_name: env_var(DB_NAME_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),

            token_signing_key,

            email_enabled: if cfg!(test) {
                false
            } else {
                env_var_or(EMAIL_ENABLED_VAR, false)
            },
            email_from_address,
            email_reply_to_address,
            smtp_username: env_var_or(SMTP_USERNAME_VAR, String::new()),
            smtp_key: env_var_or(SMTP_KEY_VAR, String::new()),
            smtp_address: env_var_or(SMTP_ADDRESS_VAR, String::new()),
            max_smtp_connections: env_var_or(MAX_SMTP_CONNECTIONS_VAR, 24),
            smtp_idle_timeout: Duration::from_secs(env_var_or(SMTP_IDLE_TIMEOUT_SECS_VAR, 60)),

            push_enabled: if cfg!(test) {
                false
            } else {
                env_var_or(PUSH_ENABLED_VAR, false)
            },
            push_gateway_url: env_var_or(PUSH_GATEWAY_URL_VAR, String::new()),
            push_gateway_key: env_var_or(PUSH_GATEWAY_KEY_VAR, String::new()),
            push_timeout: Duration::from_secs(env_var_or(PUSH_TIMEOUT_SECS_VAR, 10)),

            invite_accept_url: env_var_or(
                INVITE_ACCEPT_URL_VAR,
                String::from("https://app.tally.app/invitations/respond"),
            ),
            invite_lifetime: Duration::from_secs(env_var_or(INVITE_LIFETIME_DAYS_VAR, 7) * 86400),

            health_endpoint_key: if cfg!(test) {
                String::from("test_health_endpoint_key")
            } else {
                env_var_or(HEALTH_ENDPOINT_KEY_VAR, String::new())
            },
            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::MissingVar(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::InvalidVar(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}
