use std::env;
use std::fmt;
use std::str::FromStr;

/// Which location a clock-in falls back to when the request names none
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultLocation {
    /// Require an explicit `locationId` on every clock-in
    None,
    /// Use the oldest location on record; only sensible for single-site deployments
    First,
    /// Use a fixed location id
    Id(String),
}

impl FromStr for DefaultLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("DEFAULT_LOCATION must not be empty".to_string()),
            v if v.eq_ignore_ascii_case("none") => Ok(DefaultLocation::None),
            v if v.eq_ignore_ascii_case("first") => Ok(DefaultLocation::First),
            v => Ok(DefaultLocation::Id(v.to_string())),
        }
    }
}

impl fmt::Display for DefaultLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultLocation::None => write!(f, "none"),
            DefaultLocation::First => write!(f, "first"),
            DefaultLocation::Id(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub default_location: DefaultLocation,
    pub seed_manager_email: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET")
                .expect("JWT_SECRET must be set"),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            default_location: env::var("DEFAULT_LOCATION")
                .unwrap_or_else(|_| "none".to_string())
                .parse()
                .expect("DEFAULT_LOCATION must be none, first or a location id"),
            seed_manager_email: env::var("SEED_MANAGER_EMAIL").ok().filter(|v| !v.is_empty()),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_location() {
        assert_eq!("none".parse::<DefaultLocation>(), Ok(DefaultLocation::None));
        assert_eq!("FIRST".parse::<DefaultLocation>(), Ok(DefaultLocation::First));
        assert_eq!(
            " main-hospital ".parse::<DefaultLocation>(),
            Ok(DefaultLocation::Id("main-hospital".to_string()))
        );
        assert!("  ".parse::<DefaultLocation>().is_err());
    }

    #[test]
    fn test_display_round_trips_keywords() {
        assert_eq!(DefaultLocation::First.to_string(), "first");
        assert_eq!(DefaultLocation::Id("nursing-home".into()).to_string(), "nursing-home");
    }
}
