use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use pmoconfig::Config;

use crate::errors::SoapError;
use crate::transport::SoapDialect;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(pmoconfig::DEFAULT_TIMEOUT_SECS);

/// Version du protocole SOAP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoapVersion {
    #[default]
    V1_1,
    V1_2,
}

impl SoapVersion {
    /// Namespace of the `Envelope` element
    pub fn envelope_namespace(self) -> &'static str {
        match self {
            SoapVersion::V1_1 => "http://schemas.xmlsoap.org/soap/envelope/",
            SoapVersion::V1_2 => "http://www.w3.org/2003/05/soap-envelope",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SoapVersion::V1_1 => "1.1",
            SoapVersion::V1_2 => "1.2",
        }
    }
}

impl fmt::Display for SoapVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoapVersion {
    type Err = SoapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.1" | "11" => Ok(SoapVersion::V1_1),
            "1.2" | "12" => Ok(SoapVersion::V1_2),
            other => Err(SoapError::Config(format!("unsupported SOAP version '{}'", other))),
        }
    }
}

/// Paramètres d'un appel SOAP
///
/// `uri`, `endpoint` and `namespace` are required; everything else has a
/// default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapConfig {
    /// Service URI, base of the SOAPAction header
    pub uri: String,

    /// URL the envelope is posted to
    pub endpoint: String,

    /// Namespace of the method element
    pub namespace: String,

    pub version: SoapVersion,

    pub timeout: Duration,

    /// Remove `xmlns="..."` declarations from responses before parsing
    pub strip_default_namespace: bool,

    pub dialect: SoapDialect,

    /// Outbound HTTP proxy
    pub http_proxy: Option<String>,
}

impl SoapConfig {
    pub fn new(
        uri: impl Into<String>,
        endpoint: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            endpoint: endpoint.into(),
            namespace: namespace.into(),
            version: SoapVersion::default(),
            timeout: DEFAULT_TIMEOUT,
            strip_default_namespace: true,
            dialect: SoapDialect::default(),
            http_proxy: None,
        }
    }

    pub fn with_version(mut self, version: SoapVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_strip_default_namespace(mut self, strip: bool) -> Self {
        self.strip_default_namespace = strip;
        self
    }

    pub fn with_dialect(mut self, dialect: SoapDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_http_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.http_proxy = Some(proxy.into());
        self
    }

    /// Checks that the required settings are present
    pub fn validate(&self) -> Result<(), SoapError> {
        if self.uri.trim().is_empty() {
            return Err(SoapError::MissingParameter("uri"));
        }
        if self.endpoint.trim().is_empty() {
            return Err(SoapError::MissingParameter("endpoint"));
        }
        if self.namespace.trim().is_empty() {
            return Err(SoapError::MissingParameter("namespace"));
        }
        Ok(())
    }

    /// Builds the settings of a named service from the `services` section of
    /// the configuration, falling back to the `soap` section defaults.
    pub fn from_service(config: &Config, name: &str) -> Result<Self, SoapError> {
        let service = config
            .get_service(name)
            .map_err(|e| SoapError::Config(format!("{:#}", e)))?;

        let version = service
            .version
            .unwrap_or_else(|| config.get_soap_version())
            .parse::<SoapVersion>()?;
        let dialect = service
            .dialect
            .unwrap_or_else(|| config.get_dialect())
            .parse::<SoapDialect>()?;
        let timeout = Duration::from_secs(
            service
                .timeout_secs
                .unwrap_or_else(|| config.get_timeout_secs()),
        );
        let strip_default_namespace = service
            .strip_default_namespace
            .unwrap_or_else(|| config.get_strip_default_namespace());

        let soap_config = SoapConfig {
            uri: service.uri,
            endpoint: service.endpoint,
            namespace: service.namespace,
            version,
            timeout,
            strip_default_namespace,
            dialect,
            http_proxy: service.http_proxy.filter(|p| !p.trim().is_empty()),
        };
        soap_config.validate()?;
        Ok(soap_config)
    }
}
