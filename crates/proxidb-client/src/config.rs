use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// A seed host:port pair used to reach the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPort {
    pub host: String,
    pub port: u16,
}

impl HostPort {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for HostPort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("seed '{}' is not in host:port form", s))?;
        if host.is_empty() {
            return Err(format!("seed '{}' has an empty host", s));
        }
        let port = port
            .parse::<u16>()
            .map_err(|e| format!("seed '{}' has an invalid port: {}", s, e))?;
        Ok(Self::new(host, port))
    }
}

/// Credentials for user authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// ProxiDB client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Seed nodes used to reach the cluster
    pub seeds: Vec<HostPort>,
    /// Credentials for authentication
    pub credentials: Option<Credentials>,
    /// Root CA certificate path; enables TLS when set
    pub root_ca_path: Option<PathBuf>,
    /// Client certificate chain path for mutual TLS
    pub cert_chain_path: Option<PathBuf>,
    /// Client private key path for mutual TLS
    pub private_key_path: Option<PathBuf>,
    /// Expected TLS server name when it differs from the seed host
    pub ssl_target_name_override: Option<String>,
    /// Path to a gRPC service-config JSON document controlling retry/backoff
    pub service_config_path: Option<PathBuf>,
    /// The seeds point at a load balancer rather than cluster nodes
    pub is_loadbalancer: bool,
    /// Default per-call deadline applied when a call passes no timeout
    pub default_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            seeds: vec![HostPort::new("localhost", 50051)],
            credentials: None,
            root_ca_path: None,
            cert_chain_path: None,
            private_key_path: None,
            ssl_target_name_override: None,
            service_config_path: None,
            is_loadbalancer: false,
            default_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with a single seed
    pub fn new(seed: HostPort) -> Self {
        Self {
            seeds: vec![seed],
            ..Default::default()
        }
    }

    /// Add a seed node
    pub fn with_seed(mut self, seed: HostPort) -> Self {
        self.seeds.push(seed);
        self
    }

    /// Set authentication credentials
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the root CA certificate path, enabling TLS
    pub fn with_root_ca<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.root_ca_path = Some(path.into());
        self
    }

    /// Set the client certificate chain and private key paths for mutual TLS
    pub fn with_client_identity<C: Into<PathBuf>, K: Into<PathBuf>>(
        mut self,
        cert_chain: C,
        private_key: K,
    ) -> Self {
        self.cert_chain_path = Some(cert_chain.into());
        self.private_key_path = Some(private_key.into());
        self
    }

    /// Set the expected TLS server name
    pub fn with_ssl_target_name_override<S: Into<String>>(mut self, name: S) -> Self {
        self.ssl_target_name_override = Some(name.into());
        self
    }

    /// Set the service-config document path
    pub fn with_service_config<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.service_config_path = Some(path.into());
        self
    }

    /// Mark the seeds as a load balancer
    pub fn with_loadbalancer(mut self, is_loadbalancer: bool) -> Self {
        self.is_loadbalancer = is_loadbalancer;
        self
    }

    /// Set the default per-call deadline
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }
}

/// Serializable client configuration for saving/loading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableClientConfig {
    /// Seed nodes as host:port strings
    pub seeds: Vec<String>,
    /// Username for authentication
    pub username: Option<String>,
    /// Password for authentication
    pub password: Option<String>,
    /// Root CA certificate path
    pub root_ca_path: Option<String>,
    /// Client certificate chain path
    pub cert_chain_path: Option<String>,
    /// Client private key path
    pub private_key_path: Option<String>,
    /// Expected TLS server name
    pub ssl_target_name_override: Option<String>,
    /// Service-config document path
    pub service_config_path: Option<String>,
    /// The seeds point at a load balancer
    pub is_loadbalancer: bool,
    /// Default per-call deadline in milliseconds
    pub default_timeout_ms: Option<u64>,
}

impl From<&ClientConfig> for SerializableClientConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            seeds: config.seeds.iter().map(|s| s.to_string()).collect(),
            username: config.credentials.as_ref().map(|c| c.username.clone()),
            password: config.credentials.as_ref().map(|c| c.password.clone()),
            root_ca_path: config
                .root_ca_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            cert_chain_path: config
                .cert_chain_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            private_key_path: config
                .private_key_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            ssl_target_name_override: config.ssl_target_name_override.clone(),
            service_config_path: config
                .service_config_path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            is_loadbalancer: config.is_loadbalancer,
            default_timeout_ms: config.default_timeout.map(|d| d.as_millis() as u64),
        }
    }
}

impl TryFrom<SerializableClientConfig> for ClientConfig {
    type Error = String;

    fn try_from(config: SerializableClientConfig) -> Result<Self, Self::Error> {
        let seeds = config
            .seeds
            .iter()
            .map(|s| s.parse())
            .collect::<Result<Vec<HostPort>, String>>()?;
        let credentials = match (config.username, config.password) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            _ => return Err("username and password must be set together".to_string()),
        };
        Ok(Self {
            seeds,
            credentials,
            root_ca_path: config.root_ca_path.map(PathBuf::from),
            cert_chain_path: config.cert_chain_path.map(PathBuf::from),
            private_key_path: config.private_key_path.map(PathBuf::from),
            ssl_target_name_override: config.ssl_target_name_override,
            service_config_path: config.service_config_path.map(PathBuf::from),
            is_loadbalancer: config.is_loadbalancer,
            default_timeout: config.default_timeout_ms.map(Duration::from_millis),
        })
    }
}

impl SerializableClientConfig {
    /// Load client configuration from a file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, std::io::Error> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Failed to parse config: {}", e),
            )
        })
    }

    /// Save client configuration to a file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let contents = toml::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to serialize config: {}", e),
            )
        })?;
        std::fs::write(path, contents)
    }
}

impl ClientConfig {
    /// Load configuration from a file
    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, std::io::Error> {
        let config = SerializableClientConfig::load_from_file(path)?;
        config
            .try_into()
            .map_err(|e: String| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let config = SerializableClientConfig::from(self);
        config.save_to_file(path)
    }
}
