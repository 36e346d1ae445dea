use std::net::TcpListener;
use std::time::Duration;

use mockito::{Matcher, Server};
use pmosoap::{
    SoapClient, SoapConfig, SoapDialect, SoapError, SoapErrorKind, SoapVersion,
};

const ADD_RESPONSE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <AddResponse xmlns="http://tempuri.org/">
      <AddResult>5</AddResult>
    </AddResponse>
  </soap:Body>
</soap:Envelope>"#;

fn endpoint(server: &Server) -> String {
    format!("{}/service", server.url())
}

#[test]
fn test_dotnet_call_over_http() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/service")
        .match_header("content-type", "text/xml; charset=utf-8")
        .match_header("soapaction", "\"http://tempuri.org/Add\"")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"<Add xmlns="http://tempuri\.org/""#.to_string()),
            Matcher::Regex(r#"<intA xsi:type="xsd:int">2</intA>"#.to_string()),
            Matcher::Regex(r#"<intB xsi:type="xsd:int">3</intB>"#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "text/xml; charset=utf-8")
        .with_body(ADD_RESPONSE)
        .create();

    let config = SoapConfig::new("http://tempuri.org/", endpoint(&server), "http://tempuri.org/")
        .with_dialect(SoapDialect::DotNet)
        .with_timeout(Duration::from_secs(5));
    let mut client = SoapClient::new(config).unwrap();

    let response = client
        .fetch(
            "Add",
            r#"<intA _value_type="int">2</intA><intB _value_type="int">3</intB>"#,
        )
        .unwrap();

    mock.assert();
    assert!(response.xml.contains("<AddResponse>"));
    assert!(!response.xml.contains(r#"xmlns="http://tempuri.org/""#));
    assert_eq!(response.document.name, "soap:Envelope");
    assert_eq!(client.last_error(), None);
}

#[test]
fn test_generic_soap12_call_over_http() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/service")
        .match_header(
            "content-type",
            r#"application/soap+xml; charset=utf-8; action="urn:Ping#Ping""#,
        )
        .match_header("soapaction", Matcher::Missing)
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r"http://www\.w3\.org/2003/05/soap-envelope".to_string()),
            Matcher::Regex(r#"xmlns:m="urn:Ping""#.to_string()),
        ]))
        .with_status(200)
        .with_body(r#"<m:PingResponse xmlns:m="urn:Ping"/>"#)
        .create();

    let config = SoapConfig::new("urn:Ping", endpoint(&server), "urn:Ping")
        .with_version(SoapVersion::V1_2);
    let mut client = SoapClient::new(config).unwrap();

    let response = client.fetch("Ping", "").unwrap();
    mock.assert();
    assert_eq!(response.document.name, "m:PingResponse");
}

#[test]
fn test_fault_with_http_500() {
    let fault = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <soap:Fault>
      <faultcode>soap:Client</faultcode>
      <faultstring>Bad input</faultstring>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#;
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/service")
        .match_header("soapaction", "\"urn:Calc#Divide\"")
        .with_status(500)
        .with_header("content-type", "text/xml; charset=utf-8")
        .with_body(fault)
        .create();

    let mut client =
        SoapClient::new(SoapConfig::new("urn:Calc", endpoint(&server), "urn:Calc")).unwrap();

    let err = client.fetch("Divide", "<a>1</a><b>0</b>").unwrap_err();
    mock.assert();
    assert_eq!(err, SoapError::Fault("Bad input".to_string()));
    assert_eq!(err.kind(), SoapErrorKind::ApplicationFault);
    assert_eq!(client.last_error(), Some("Bad input"));
    assert!(client.last_response().is_none());
}

#[test]
fn test_empty_error_response_is_a_transport_failure() {
    let mut server = Server::new();
    let mock = server.mock("POST", "/service").with_status(503).create();

    let mut client =
        SoapClient::new(SoapConfig::new("urn:Calc", endpoint(&server), "urn:Calc")).unwrap();

    let err = client.fetch("Add", "<a>1</a>").unwrap_err();
    mock.assert();
    assert_eq!(err, SoapError::Transport("503 Service Unavailable".to_string()));
    assert_eq!(client.last_error(), Some("503 Service Unavailable"));
}

#[test]
fn test_connection_refused() {
    // Port réservé puis libéré : plus personne n'écoute
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = SoapConfig::new("urn:Calc", format!("http://127.0.0.1:{port}/"), "urn:Calc")
        .with_timeout(Duration::from_secs(2));
    let mut client = SoapClient::new(config).unwrap();

    let err = client.fetch("Add", "").unwrap_err();
    assert_eq!(err.kind(), SoapErrorKind::Http);
    assert!(client.last_error().unwrap().starts_with("HTTP error"));
}

#[test]
fn test_invalid_fragment_never_reaches_the_network() {
    let mut server = Server::new();
    let mock = server.mock("POST", Matcher::Any).expect(0).create();

    let mut client =
        SoapClient::new(SoapConfig::new("urn:Calc", endpoint(&server), "urn:Calc")).unwrap();
    let err = client.fetch("Add", "<a>1</b>").unwrap_err();

    assert_eq!(err.kind(), SoapErrorKind::XmlParse);
    mock.assert();
}
