use tracing::{debug, warn};
use xmltree::Element;

use crate::config::SoapConfig;
use crate::errors::SoapError;
use crate::params::convert;
use crate::response::{FetchResult, SoapResponse, normalize};
use crate::transport::{HttpTransport, SoapCall, SoapTransport};

/// SOAP client for one service
///
/// Keeps the outcome of the last [`fetch`](SoapClient::fetch): the response on
/// success, the error message on failure. Not meant to be shared between
/// threads without external locking.
#[derive(Debug)]
pub struct SoapClient<T = HttpTransport> {
    config: SoapConfig,
    transport: T,
    last_error: Option<String>,
    last_response: Option<SoapResponse>,
}

impl SoapClient<HttpTransport> {
    /// HTTP client for `config`
    pub fn new(config: SoapConfig) -> Result<Self, SoapError> {
        Self::with_transport(config, HttpTransport::new())
    }

    /// HTTP client for a service of the global configuration
    pub fn from_service(name: &str) -> Result<Self, SoapError> {
        let config = SoapConfig::from_service(&pmoconfig::get_config(), name)?;
        Self::new(config)
    }
}

impl<T: SoapTransport> SoapClient<T> {
    pub fn with_transport(config: SoapConfig, transport: T) -> Result<Self, SoapError> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            last_error: None,
            last_response: None,
        })
    }

    /// Invokes `method` with the parameters described by the `xml` fragment.
    ///
    /// `xml` may be empty for a call without parameters. On failure the
    /// message is also available through [`last_error`](Self::last_error).
    pub fn fetch(&mut self, method: &str, xml: &str) -> FetchResult {
        self.last_error = None;
        self.last_response = None;

        match self.call(method, xml) {
            Ok(response) => {
                debug!(method = %method, bytes = response.xml.len(), "SOAP call succeeded");
                self.last_response = Some(response.clone());
                Ok(response)
            }
            Err(err) => {
                warn!(method = %method, endpoint = %self.config.endpoint, error = %err, "SOAP call failed");
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn call(&self, method: &str, xml: &str) -> FetchResult {
        if method.trim().is_empty() {
            return Err(SoapError::MissingParameter("method"));
        }

        let params = convert(xml)?;
        let call = SoapCall {
            method,
            params: &params,
            config: &self.config,
        };
        let raw = self.transport.send(&call)?;

        normalize(&raw, self.config.strip_default_namespace)
    }

    pub fn config(&self) -> &SoapConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Message of the last failed call
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_response(&self) -> Option<&SoapResponse> {
        self.last_response.as_ref()
    }

    /// XML of the last successful call
    pub fn last_xml(&self) -> Option<&str> {
        self.last_response.as_ref().map(|r| r.xml.as_str())
    }

    /// Parsed document of the last successful call
    pub fn last_document(&self) -> Option<&Element> {
        self.last_response.as_ref().map(|r| &r.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Transport renvoyant une réponse fixe et mémorisant les appels
    #[derive(Debug)]
    struct CannedTransport {
        reply: Result<String, SoapError>,
        calls: RefCell<Vec<(String, usize)>>,
    }

    impl CannedTransport {
        fn replying(body: &str) -> Self {
            Self {
                reply: Ok(body.to_string()),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl SoapTransport for CannedTransport {
        fn send(&self, call: &SoapCall<'_>) -> Result<String, SoapError> {
            self.calls
                .borrow_mut()
                .push((call.method.to_string(), call.params.roots().len()));
            self.reply.clone()
        }
    }

    fn config() -> SoapConfig {
        SoapConfig::new("urn:Test", "http://localhost/soap", "urn:Test")
    }

    #[test]
    fn test_constructor_validates_config() {
        let err = SoapClient::with_transport(
            SoapConfig::new("urn:Test", "", "urn:Test"),
            CannedTransport::replying(""),
        )
        .unwrap_err();
        assert_eq!(err, SoapError::MissingParameter("endpoint"));
    }

    #[test]
    fn test_missing_method() {
        let mut client =
            SoapClient::with_transport(config(), CannedTransport::replying("<ok/>")).unwrap();
        let err = client.fetch("", "<a>1</a>").unwrap_err();
        assert_eq!(err, SoapError::MissingParameter("method"));
        assert_eq!(client.last_error(), Some("Missing required parameter: method"));
        assert!(client.transport().calls.borrow().is_empty());
    }

    #[test]
    fn test_success_is_recorded() {
        let mut client = SoapClient::with_transport(
            config(),
            CannedTransport::replying(r#"<EchoResponse xmlns="urn:Test"><r>1</r></EchoResponse>"#),
        )
        .unwrap();

        let response = client.fetch("Echo", "<a>1</a><b>2</b>").unwrap();
        assert_eq!(response.xml, "<EchoResponse><r>1</r></EchoResponse>");
        assert_eq!(client.last_xml(), Some(response.xml.as_str()));
        assert_eq!(client.last_document().map(|d| d.name.as_str()), Some("EchoResponse"));
        assert_eq!(client.last_error(), None);
        assert_eq!(
            client.transport().calls.borrow().as_slice(),
            &[("Echo".to_string(), 2)]
        );
    }

    #[test]
    fn test_failure_clears_previous_response() {
        let mut client =
            SoapClient::with_transport(config(), CannedTransport::replying("<ok/>")).unwrap();
        client.fetch("Ping", "").unwrap();
        assert!(client.last_response().is_some());

        let err = client.fetch("Ping", "<broken>").unwrap_err();
        assert!(matches!(err, SoapError::XmlParse(_)));
        assert!(client.last_response().is_none());
        assert!(client.last_error().unwrap().starts_with("XML parse error"));
    }

    #[test]
    fn test_transport_error_is_surfaced() {
        let transport = CannedTransport {
            reply: Err(SoapError::Http("connection refused".to_string())),
            calls: RefCell::new(Vec::new()),
        };
        let mut client = SoapClient::with_transport(config(), transport).unwrap();
        let err = client.fetch("Ping", "").unwrap_err();
        assert_eq!(err, SoapError::Http("connection refused".to_string()));
        assert_eq!(client.last_error(), Some("HTTP error: connection refused"));
    }
}
