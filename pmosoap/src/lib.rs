//! # PMOSoap - appels de services SOAP
//!
//! Couche de confort pour invoquer des services web SOAP sans WSDL : les
//! paramètres de l'appel sont décrits par un fragment XML, la réponse est
//! renvoyée brute et analysée.
//!
//! ## Fonctionnalités
//!
//! - ✅ Conversion d'un fragment XML en arbre de paramètres typés
//! - ✅ Construction d'enveloppes SOAP 1.1 / 1.2
//! - ✅ Dialectes .NET et générique (SOAPAction, namespace de la méthode)
//! - ✅ Transport HTTP via `ureq`
//! - ✅ Détection des erreurs de transport, d'analyse XML et des SOAP Faults
//!
//! ## Architecture
//!
//! - [`convert`] : fragment XML → [`ParamTree`]
//! - [`SoapTransport`] : envoi d'un appel ([`HttpTransport`] en production)
//! - [`normalize`] : réponse brute → [`FetchResult`]
//! - [`SoapClient`] : enchaîne les trois et garde la dernière erreur
//!
//! ## Example
//!
//! ```no_run
//! use pmosoap::{SoapClient, SoapConfig, SoapDialect};
//!
//! let config = SoapConfig::new(
//!     "http://tempuri.org/",
//!     "http://localhost:8080/Calculator.asmx",
//!     "http://tempuri.org/",
//! )
//! .with_dialect(SoapDialect::DotNet);
//!
//! let mut client = SoapClient::new(config)?;
//! match client.fetch("Add", r#"<intA _value_type="int">2</intA><intB _value_type="int">3</intB>"#) {
//!     Ok(response) => println!("{}", response.xml),
//!     Err(err) => eprintln!("SOAP call failed: {}", err),
//! }
//! # Ok::<(), pmosoap::SoapError>(())
//! ```

pub mod client;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod params;
pub mod response;
pub mod transport;
pub mod xml;

pub use client::SoapClient;
pub use config::{DEFAULT_TIMEOUT, SoapConfig, SoapVersion};
pub use envelope::build_envelope;
pub use errors::{RESPONSE_PARSE_MESSAGE, SoapError, SoapErrorKind};
pub use params::{
    DEFAULT_VALUE_TYPE, NodeId, ParamTree, ParameterNode, VALUE_TYPE_ATTRIBUTE, convert,
};
pub use response::{FetchResult, SoapResponse, normalize, strip_default_namespaces};
pub use transport::{HttpTransport, SoapCall, SoapDialect, SoapTransport};
