use config::ConfigError;

/// Longest accepted token lifetime, in seconds (10 years).
pub const MAX_TOKEN_LIFETIME: i64 = 10 * 365 * 24 * 60 * 60;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origin allowed to call the API from a browser. CORS headers are only sent when set.
    #[serde(default)]
    pub cors_allowed_origin: Option<String>,
    /// bcrypt cost of the stored password hashes.
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,
}

impl ApplicationSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(4..=31).contains(&self.password_hash_cost) {
            return Err(ConfigError::Message(
                "application.password_hash_cost must be between 4 and 31".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// JWT authentication settings
///
/// The secret is immutable after startup and shared by every worker.
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    /// Issuer and audience of every access token.
    #[serde(default = "default_domain")]
    pub domain: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64, // seconds (900 = 15 minutes)
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64, // seconds (86400 = 24 hours)
    #[serde(default = "default_refresh_grace_period")]
    pub refresh_grace_period: i64, // seconds before refresh-token expiry when renewal is honoured
    #[serde(default)]
    pub cookie: RefreshCookieSettings,
}

/// Refresh cookie transport
#[derive(serde::Deserialize, Clone, Debug)]
pub struct RefreshCookieSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cookie_name")]
    pub name: String,
    #[serde(default = "default_cookie_path")]
    pub path: String,
    /// Left unset by default; the `__Host-` prefix forbids a Domain attribute.
    #[serde(default)]
    pub domain: Option<String>,
}

impl Default for RefreshCookieSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            name: default_cookie_name(),
            path: default_cookie_path(),
            domain: None,
        }
    }
}

impl JwtSettings {
    /// Settings with the reference lifetimes for the given secret and domain.
    pub fn new(secret: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            domain: domain.into(),
            access_token_expiry: default_access_token_expiry(),
            refresh_token_expiry: default_refresh_token_expiry(),
            refresh_grace_period: default_refresh_grace_period(),
            cookie: RefreshCookieSettings::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::Message("jwt.secret must not be empty".to_string()));
        }
        if self.domain.trim().is_empty() {
            return Err(ConfigError::Message("jwt.domain must not be empty".to_string()));
        }
        let durations = [
            ("jwt.access_token_expiry", self.access_token_expiry),
            ("jwt.refresh_token_expiry", self.refresh_token_expiry),
            ("jwt.refresh_grace_period", self.refresh_grace_period),
        ];
        for (key, value) in durations {
            if value <= 0 {
                return Err(ConfigError::Message(format!("{} must be positive", key)));
            }
            if value > MAX_TOKEN_LIFETIME {
                return Err(ConfigError::Message(format!(
                    "{} must not exceed {} seconds",
                    key, MAX_TOKEN_LIFETIME
                )));
            }
        }
        if self.refresh_grace_period >= self.refresh_token_expiry {
            return Err(ConfigError::Message(
                "jwt.refresh_grace_period must be shorter than jwt.refresh_token_expiry".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_password_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_domain() -> String {
    "example.com".to_string()
}

fn default_access_token_expiry() -> i64 {
    15 * 60
}

fn default_refresh_token_expiry() -> i64 {
    24 * 60 * 60
}

fn default_refresh_grace_period() -> i64 {
    30
}

fn default_cookie_name() -> String {
    "__Host-refresh_token".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

/// Reads `configuration.yaml` (optional) and then `APP_*` environment variables,
/// e.g. `APP_JWT__SECRET`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.application.validate()?;
    settings.jwt.validate()?;
    Ok(settings)
}
