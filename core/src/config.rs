/// Transport configuration, resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Research endpoint the session POSTs directives to.
    pub endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/research".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("RESEARCH_ENDPOINT") {
            if !endpoint.is_empty() {
                config.endpoint = endpoint;
            }
        }

        config
    }
}
