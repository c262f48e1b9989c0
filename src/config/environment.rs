// Start of file: /src/config/environment.rs

// * Environment configuration, loaded once at startup and carried
// * in the application state.

use std::{borrow::Cow, collections::HashMap, fmt};
// * anyhow for convenient error handling
use anyhow::{Context, Result};
use tracing::warn;

use crate::utils::utils::trim_base_url;

// ! Default values for environment variables (used if variables aren't set):
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PROTOCOL: &str = "http";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_BODY_SIZE: usize = 2_097_152; // 2MB
const DEFAULT_PLAID_DOMAIN: &str = "https://sandbox.plaid.com";
const DEFAULT_TASK_WORKERS: usize = 4;

// * A struct containing all environment variables used by the app
#[derive(Clone)]
pub struct EnvironmentVariables {
    pub environment: Cow<'static, str>,
    pub host: Cow<'static, str>,
    pub port: u16,
    pub protocol: Cow<'static, str>,
    pub max_request_body_size: usize,
    // Upstream base URL, without trailing slash
    pub plaid_domain: Cow<'static, str>,
    // Public URL of this service, used in notes and the webhook URL
    pub site_domain_name: Cow<'static, str>,
    // Task broker and result backend; None runs tasks in-process
    pub redis_endpoint: Option<String>,
    pub task_workers: usize,
    pub plaid_access_token: Option<String>,
    pub plaid_client_id: Option<String>,
    pub plaid_secret: Option<String>,
}

impl EnvironmentVariables {
    // * Loads environment variables from the process and .env.
    // * Only reads .env if ENVIRONMENT != "production".
    pub fn load() -> Result<Self> {
        // ? In non-production environments, attempt to load .env
        if std::env::var("ENVIRONMENT").unwrap_or_default() != "production" {
            dotenv::dotenv().ok();
        }

        // * Collect all environment vars from the system and .env
        let vars: HashMap<String, String> = std::env::vars()
            .chain(dotenv::vars())
            .collect();

        let config: EnvironmentVariables = Self::from_vars(&vars)?;

        if cfg!(debug_assertions) {
            tracing::debug!("Loaded environment configuration: {:#?}", config);
        }

        Ok(config)
    }

    // * Builds the configuration from a variable map, providing defaults if missing
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        // * A small helper closure to fetch a non-empty variable by key
        let get_var = |key: &str| {
            vars.get(key)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
        };

        let environment: Cow<'static, str> = get_var("ENVIRONMENT")
            .map(|s| Cow::Owned(s.into()))
            .unwrap_or_else(|| {
                warn!("Missing ENVIRONMENT, defaulting to '{DEFAULT_ENVIRONMENT}'");
                Cow::Borrowed(DEFAULT_ENVIRONMENT)
            });

        let host: Cow<'static, str> = get_var("HOST")
            .map(|s| Cow::Owned(s.into()))
            .unwrap_or(Cow::Borrowed(DEFAULT_HOST));

        let port: u16 = get_var("PORT")
            .map(|s| s.parse().context("Invalid PORT value"))
            .transpose()?
            .unwrap_or(DEFAULT_PORT);

        let protocol: Cow<'static, str> = get_var("PROTOCOL")
            .map(|s| Cow::Owned(s.into()))
            .unwrap_or(Cow::Borrowed(DEFAULT_PROTOCOL));

        let max_request_body_size: usize = get_var("MAX_REQUEST_BODY_SIZE")
            .map(|s| s.parse().context("Invalid MAX_REQUEST_BODY_SIZE"))
            .transpose()?
            .unwrap_or(DEFAULT_MAX_BODY_SIZE);

        let plaid_domain: Cow<'static, str> = get_var("PLAID_DOMAIN_SANDBOX")
            .map(|s| Cow::Owned(trim_base_url(s)))
            .unwrap_or_else(|| {
                warn!("Missing PLAID_DOMAIN_SANDBOX, defaulting to '{DEFAULT_PLAID_DOMAIN}'");
                Cow::Borrowed(DEFAULT_PLAID_DOMAIN)
            });

        let site_domain_name: Cow<'static, str> = match get_var("SITE_DOMAIN_NAME") {
            Some(site) => Cow::Owned(trim_base_url(site)),
            None => {
                let fallback: String = format!("{protocol}://{host}:{port}");
                warn!("Missing SITE_DOMAIN_NAME, defaulting to '{fallback}'");
                Cow::Owned(fallback)
            }
        };

        let redis_endpoint: Option<String> = get_var("REDIS_ENDPOINT").map(str::to_string);
        if redis_endpoint.is_none() {
            warn!("Missing REDIS_ENDPOINT, background tasks will run on the in-process worker pool");
        }

        let task_workers: usize = get_var("TASK_WORKERS")
            .map(|s| s.parse().context("Invalid TASK_WORKERS"))
            .transpose()?
            .unwrap_or(DEFAULT_TASK_WORKERS);

        if task_workers == 0 {
            anyhow::bail!("TASK_WORKERS must be at least 1");
        }

        Ok(Self {
            environment,
            host,
            port,
            protocol,
            max_request_body_size,
            plaid_domain,
            site_domain_name,
            redis_endpoint,
            task_workers,
            plaid_access_token: get_var("PLAID_ACCESS_TOKEN").map(str::to_string),
            plaid_client_id: get_var("PLAID_CLIENT_ID").map(str::to_string),
            plaid_secret: get_var("PLAID_SECRET").map(str::to_string),
        })
    }

    // * Full upstream URL for a fixed path such as "link/token/create"
    pub fn upstream_url(&self, path: &str) -> String {
        format!("{}/{}", self.plaid_domain, path)
    }

    // * Self-referential URL for one of our own routes
    pub fn site_url(&self, route: &str) -> String {
        format!("{}{}", self.site_domain_name, route)
    }
}

// ! Credentials are redacted so the startup dump never leaks them
impl fmt::Debug for EnvironmentVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");

        f.debug_struct("EnvironmentVariables")
            .field("environment", &self.environment)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("max_request_body_size", &self.max_request_body_size)
            .field("plaid_domain", &self.plaid_domain)
            .field("site_domain_name", &self.site_domain_name)
            .field("redis_endpoint", &self.redis_endpoint)
            .field("task_workers", &self.task_workers)
            .field("plaid_access_token", &redact(&self.plaid_access_token))
            .field("plaid_client_id", &self.plaid_client_id)
            .field("plaid_secret", &redact(&self.plaid_secret))
            .finish()
    }
}


// End of file: /src/config/environment.rs
