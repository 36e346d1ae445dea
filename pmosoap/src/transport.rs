use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};
use ureq::{Agent, Proxy};

use crate::config::{SoapConfig, SoapVersion};
use crate::envelope::build_envelope;
use crate::errors::SoapError;
use crate::params::ParamTree;

/// Manière d'attacher l'action SOAP et le namespace de la méthode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoapDialect {
    /// `SOAPAction: "uri/Method"`, method element in the default namespace
    DotNet,
    /// `SOAPAction: "uri#Method"`, prefixed method element
    #[default]
    Generic,
}

impl SoapDialect {
    /// Value of the SOAP action for `method`
    pub fn soap_action(self, uri: &str, method: &str) -> String {
        match self {
            SoapDialect::DotNet if uri.ends_with('/') => format!("{}{}", uri, method),
            SoapDialect::DotNet => format!("{}/{}", uri, method),
            SoapDialect::Generic => format!("{}#{}", uri, method),
        }
    }
}

impl fmt::Display for SoapDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoapDialect::DotNet => f.write_str("dotnet"),
            SoapDialect::Generic => f.write_str("generic"),
        }
    }
}

impl FromStr for SoapDialect {
    type Err = SoapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dotnet" | ".net" | "net" => Ok(SoapDialect::DotNet),
            "generic" | "soap" => Ok(SoapDialect::Generic),
            other => Err(SoapError::Config(format!("unknown SOAP dialect '{}'", other))),
        }
    }
}

/// One call handed to a transport
#[derive(Debug, Clone, Copy)]
pub struct SoapCall<'a> {
    pub method: &'a str,
    pub params: &'a ParamTree,
    pub config: &'a SoapConfig,
}

/// Sends a SOAP call and returns the raw response body.
///
/// By convention a transport may return a bare status line (`"500 ..."`)
/// instead of a body; the response normalizer reports it as a transport
/// failure.
pub trait SoapTransport {
    fn send(&self, call: &SoapCall<'_>) -> Result<String, SoapError>;
}

impl<T: SoapTransport + ?Sized> SoapTransport for &T {
    fn send(&self, call: &SoapCall<'_>) -> Result<String, SoapError> {
        (**self).send(call)
    }
}

impl<T: SoapTransport + ?Sized> SoapTransport for Box<T> {
    fn send(&self, call: &SoapCall<'_>) -> Result<String, SoapError> {
        (**self).send(call)
    }
}

/// HTTP transport built on `ureq`
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpTransport;

impl HttpTransport {
    pub fn new() -> Self {
        Self
    }

    fn agent(config: &SoapConfig) -> Result<Agent, SoapError> {
        let proxy = match &config.http_proxy {
            Some(url) => Some(
                Proxy::new(url)
                    .map_err(|e| SoapError::Http(format!("invalid proxy {}: {}", url, e)))?,
            ),
            None => None,
        };

        // Les statuts 4xx/5xx ne sont pas des erreurs : un SOAP Fault arrive
        // avec un HTTP 500 et son corps doit rester lisible.
        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(config.timeout))
            .proxy(proxy)
            .build();

        Ok(agent_config.into())
    }
}

impl SoapTransport for HttpTransport {
    fn send(&self, call: &SoapCall<'_>) -> Result<String, SoapError> {
        let config = call.config;

        // 1. Build SOAP request body
        let body_xml = build_envelope(
            call.params,
            call.method,
            &config.namespace,
            config.version,
            config.dialect,
        )?;

        // 2. SOAP action, carried by a header in 1.1 and by the content type in 1.2
        let action = config.dialect.soap_action(&config.uri, call.method);
        debug!(
            endpoint = %config.endpoint,
            method = %call.method,
            soap_action = %action,
            version = %config.version,
            "Sending SOAP request"
        );

        let agent = Self::agent(config)?;
        let request = agent.post(config.endpoint.as_str());
        let request = match config.version {
            SoapVersion::V1_1 => request
                .header("Content-Type", "text/xml; charset=utf-8")
                .header("SOAPAction", format!("\"{}\"", action)),
            SoapVersion::V1_2 => request.header(
                "Content-Type",
                format!("application/soap+xml; charset=utf-8; action=\"{}\"", action),
            ),
        };

        // 3. Send HTTP POST request
        let mut response = request.send(body_xml).map_err(|e| {
            SoapError::Http(format!(
                "error when sending SOAP request to {}: {}",
                config.endpoint, e
            ))
        })?;

        let status = response.status();

        // 4. Read full body, regardless of HTTP status code
        let raw_body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| SoapError::Http(format!("failed to read SOAP response body: {}", e)))?;

        debug!(status = status.as_u16(), bytes = raw_body.len(), "SOAP response received");

        if !status.is_success() && raw_body.trim().is_empty() {
            let status_line = match status.canonical_reason() {
                Some(reason) => format!("{} {}", status.as_u16(), reason),
                None => status.as_u16().to_string(),
            };
            warn!(endpoint = %config.endpoint, status = %status_line, "SOAP call returned no body");
            return Ok(status_line);
        }

        Ok(raw_body)
    }
}
