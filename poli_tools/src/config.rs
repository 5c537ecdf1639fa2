use std::{fmt::Display, str::FromStr};

use log::*;
use poli_common::Secret;
use serde::{Deserialize, Serialize};

pub const PRODUCTION_BASE_URL: &str = "https://poliapi.apac.paywithpoli.com";
pub const UAT_BASE_URL: &str = "https://poliapi.uat3.paywithpoli.com";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoliEndpoint {
    #[default]
    Production,
    Uat,
}

impl PoliEndpoint {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_BASE_URL,
            Self::Uat => UAT_BASE_URL,
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, Self::Uat)
    }
}

impl Display for PoliEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Uat => write!(f, "uat"),
        }
    }
}

impl FromStr for PoliEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "uat" => Ok(Self::Uat),
            other => Err(format!("'{other}' is not a valid POLi endpoint. Use 'production' or 'uat'")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PoliConfig {
    pub merchant_code: String,
    pub authentication_code: Secret<String>,
    pub endpoint: PoliEndpoint,
    /// Replaces the endpoint's base URL. Used to point the client at a stand-in gateway.
    pub base_url_override: Option<String>,
}

impl PoliConfig {
    pub fn new(merchant_code: &str, authentication_code: Secret<String>, endpoint: PoliEndpoint) -> Self {
        Self { merchant_code: merchant_code.to_string(), authentication_code, endpoint, base_url_override: None }
    }

    pub fn with_base_url<S: Into<String>>(mut self, base_url: Option<S>) -> Self {
        self.base_url_override = base_url.map(Into::into);
        self
    }

    pub fn base_url(&self) -> &str {
        match &self.base_url_override {
            Some(url) => {
                trace!("Using overridden POLi base URL {url}");
                url.as_str()
            },
            None => self.endpoint.base_url(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn endpoints() {
        assert_eq!("uat".parse::<PoliEndpoint>().unwrap(), PoliEndpoint::Uat);
        assert_eq!(" Production ".parse::<PoliEndpoint>().unwrap(), PoliEndpoint::Production);
        assert!("sandbox".parse::<PoliEndpoint>().is_err());
        assert_eq!(PoliEndpoint::Uat.to_string(), "uat");
        let config = PoliConfig::new("M1", Secret::new("pw".into()), PoliEndpoint::Uat);
        assert_eq!(config.base_url(), UAT_BASE_URL);
        let config = config.with_base_url(Some("http://localhost:9999"));
        assert_eq!(config.base_url(), "http://localhost:9999");
    }
}
