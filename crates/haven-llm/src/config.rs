use std::collections::HashMap;
use std::time::Duration;

/// Authentication configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthConfig {
    /// API key sent as a bearer token (OpenAI style)
    ApiKey { key: String },
    /// Bearer token authentication
    Bearer { token: String },
    /// No authentication
    #[default]
    None,
}

impl AuthConfig {
    /// Authorization header for this configuration, if any
    pub fn header(&self) -> Option<(String, String)> {
        match self {
            AuthConfig::ApiKey { key } => {
                Some(("Authorization".to_string(), format!("Bearer {}", key)))
            }
            AuthConfig::Bearer { token } => {
                Some(("Authorization".to_string(), format!("Bearer {}", token)))
            }
            AuthConfig::None => None,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Model to use
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens in the reply
    pub max_tokens: u32,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Retries for transient failures
    pub max_retries: u32,
    /// Additional headers to include
    pub headers: HashMap<String, String>,
}

impl ClientConfig {
    /// Create a new client config
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: AuthConfig::None,
            model: "gpt-4".to_string(),
            temperature: 0.8,
            max_tokens: 250,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            headers: HashMap::new(),
        }
    }

    /// Set API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.auth = AuthConfig::ApiKey { key: key.into() };
        self
    }

    /// Set bearer token
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthConfig::Bearer {
            token: token.into(),
        };
        self
    }

    /// Set model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set sampling parameters
    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set retry count for transient failures
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set additional headers
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
