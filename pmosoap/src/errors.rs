use thiserror::Error;

/// Message reported when a response body is not well-formed XML.
pub const RESPONSE_PARSE_MESSAGE: &str = "Unable to parse returned data as XML";

/// Catégorie d'erreur, pour les appelants qui ne veulent pas inspecter le message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoapErrorKind {
    XmlParse,
    MissingParameter,
    Transport,
    ApplicationFault,
    Http,
    Envelope,
    Config,
}

/// Erreur d'un appel SOAP
///
/// The `Display` output is the human-readable failure message kept in the
/// client's last-error slot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SoapError {
    /// The parameter fragment is not well-formed XML
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// The response body is not well-formed XML (parser detail in the field)
    #[error("Unable to parse returned data as XML")]
    ResponseParse(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// Empty or status-only response, carried verbatim
    #[error("{0}")]
    Transport(String),

    /// `faultstring` of the first SOAP fault found in the response
    #[error("{0}")]
    Fault(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Failed to build SOAP envelope: {0}")]
    Envelope(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SoapError {
    pub fn kind(&self) -> SoapErrorKind {
        match self {
            SoapError::XmlParse(_) | SoapError::ResponseParse(_) => SoapErrorKind::XmlParse,
            SoapError::MissingParameter(_) => SoapErrorKind::MissingParameter,
            SoapError::Transport(_) => SoapErrorKind::Transport,
            SoapError::Fault(_) => SoapErrorKind::ApplicationFault,
            SoapError::Http(_) => SoapErrorKind::Http,
            SoapError::Envelope(_) => SoapErrorKind::Envelope,
            SoapError::Config(_) => SoapErrorKind::Config,
        }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, SoapError::Fault(_))
    }
}

impl From<xmltree::Error> for SoapError {
    fn from(err: xmltree::Error) -> Self {
        SoapError::Envelope(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_and_fault_messages_are_verbatim() {
        assert_eq!(
            SoapError::Transport("500 Internal Error".to_string()).to_string(),
            "500 Internal Error"
        );
        assert_eq!(SoapError::Fault("Bad input".to_string()).to_string(), "Bad input");
    }

    #[test]
    fn response_parse_hides_parser_detail() {
        let err = SoapError::ResponseParse("unexpected end of input".to_string());
        assert_eq!(err.to_string(), RESPONSE_PARSE_MESSAGE);
        assert_eq!(err.kind(), SoapErrorKind::XmlParse);
    }

    #[test]
    fn kinds() {
        assert_eq!(
            SoapError::MissingParameter("method").kind(),
            SoapErrorKind::MissingParameter
        );
        assert!(SoapError::Fault(String::new()).is_fault());
        assert!(!SoapError::Http(String::new()).is_fault());
    }
}
