// src/core/discovery.rs

//! Read-only XMLA discovery against the server's `/xmla/default` endpoint:
//! one statement lists catalogs, a second lists the cubes of one catalog.
//! Both calls are synchronous, unary request/response with no retry and no
//! pagination. A malformed response body is treated as zero results rather
//! than a fatal error, tolerating partial server misbehavior.

use crate::constants::{XMLA_PORT, XMLA_ROWSET_NS};
use crate::models::{CatalogCubePair, PAIR_SEPARATOR, Settings};
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("could not reach the XMLA endpoint: {0}")]
    Network(#[from] reqwest::Error),
    #[error("authentication rejected by the XMLA endpoint (HTTP 401)")]
    Auth,
    #[error("XMLA endpoint returned HTTP {0}")]
    Http(u16),
}

const CATALOG_STATEMENT_ENVELOPE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"
               xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
               xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <soap:Body>
    <Execute xmlns="urn:schemas-microsoft-com:xml-analysis">
      <Command>
        <Statement>SELECT [CATALOG_NAME] from $system.DBSCHEMA_CATALOGS</Statement>
      </Command>
      <Properties>
        <PropertyList>
          <Catalog>Default</Catalog>
          <Cube>Default</Cube>
        </PropertyList>
      </Properties>
    </Execute>
  </soap:Body>
</soap:Envelope>"#;

/// Builds the cube-listing envelope for one catalog. The catalog name goes
/// through text-node escaping; names containing `<` or `&` must not corrupt
/// the request document.
fn cube_statement_envelope(catalog: &str) -> String {
    let catalog = escape(catalog);
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"
               xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
               xmlns:xsd="http://www.w3.org/2001/XMLSchema">
  <soap:Body>
    <Execute xmlns="urn:schemas-microsoft-com:xml-analysis">
      <Command>
        <Statement>SELECT [CUBE_NAME] from $system.MDSCHEMA_CUBES</Statement>
      </Command>
      <Properties>
        <PropertyList>
          <Catalog>{catalog}</Catalog>
          <Cube>Default</Cube>
        </PropertyList>
      </Properties>
    </Execute>
  </soap:Body>
</soap:Envelope>"#
    )
}

/// Blocking client for the two discovery statements.
#[derive(Debug)]
pub struct DiscoveryClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    username: String,
    password: String,
}

impl DiscoveryClient {
    pub fn new(settings: &Settings) -> Result<Self, DiscoveryError> {
        // No request timeout: a slow server blocks the call rather than
        // failing it, and recovery is operator-initiated.
        let mut builder = reqwest::blocking::Client::builder().timeout(None);
        if settings.insecure_transport {
            log::warn!(
                "TLS certificate verification is disabled (insecure_transport=true in settings)"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }
        Ok(Self {
            http: builder.build()?,
            endpoint: format!("https://{}:{}/xmla/default", settings.host, XMLA_PORT),
            username: settings.username.clone(),
            password: settings.password.clone(),
        })
    }

    /// Lists every catalog the server exposes.
    pub fn list_catalogs(&self) -> Result<Vec<String>, DiscoveryError> {
        let body = self.execute(CATALOG_STATEMENT_ENVELOPE.to_string())?;
        Ok(lenient_rowset_values(&body, b"CATALOG_NAME", "catalog listing"))
    }

    /// Lists the cubes of one catalog.
    pub fn list_cubes(&self, catalog: &str) -> Result<Vec<String>, DiscoveryError> {
        let body = self.execute(cube_statement_envelope(catalog))?;
        Ok(lenient_rowset_values(&body, b"CUBE_NAME", "cube listing"))
    }

    /// Sweeps every catalog for its cubes. A failed per-catalog cube lookup
    /// is logged and contributes zero pairs; only the initial catalog listing
    /// can fail the sweep.
    pub fn discover_pairs(&self) -> Result<Vec<CatalogCubePair>, DiscoveryError> {
        let catalogs = self.list_catalogs()?;
        let mut pairs = Vec::new();
        for catalog in catalogs {
            if catalog.contains(PAIR_SEPARATOR) {
                log::warn!(
                    "catalog name '{catalog}' contains the pair separator; \
                     selection by --models may be ambiguous"
                );
            }
            match self.list_cubes(&catalog) {
                Ok(cubes) => pairs.extend(
                    cubes
                        .into_iter()
                        .map(|cube| CatalogCubePair::new(catalog.clone(), cube)),
                ),
                Err(e) => log::warn!(
                    "cube lookup failed for catalog '{catalog}': {e}; continuing with zero cubes"
                ),
            }
        }
        Ok(pairs)
    }

    fn execute(&self, envelope: String) -> Result<String, DiscoveryError> {
        let response = self
            .http
            .post(self.endpoint.as_str())
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "text/xml")
            .body(envelope)
            .send()?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(DiscoveryError::Auth);
        }
        if !status.is_success() {
            return Err(DiscoveryError::Http(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

/// Extracts the text of every rowset element with the given local name,
/// downgrading malformed documents to an empty result with a warning.
fn lenient_rowset_values(xml: &str, element: &[u8], what: &str) -> Vec<String> {
    match rowset_values(xml, element) {
        Ok(values) => values,
        Err(e) => {
            log::warn!("discarding malformed {what} response: {e}");
            Vec::new()
        }
    }
}

/// Namespace-aware lookup of every `{rowset-ns}<element>` text value.
/// Zero matches is an empty vec, not an error.
fn rowset_values(xml: &str, element: &[u8]) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut values = Vec::new();
    let mut capturing = false;
    loop {
        match reader.read_resolved_event()? {
            (ResolveResult::Bound(Namespace(ns)), Event::Start(start))
                if ns == XMLA_ROWSET_NS.as_bytes() && start.local_name().as_ref() == element =>
            {
                capturing = true;
            }
            (_, Event::Text(text)) if capturing => {
                values.push(text.unescape()?.into_owned());
            }
            (_, Event::End(_)) if capturing => capturing = false,
            (_, Event::Eof) => break,
            _ => {}
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rowset_response(rows: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <ExecuteResponse xmlns="urn:schemas-microsoft-com:xml-analysis">
      <return>
        <root xmlns="urn:schemas-microsoft-com:xml-analysis:rowset">
          {rows}
        </root>
      </return>
    </ExecuteResponse>
  </soap:Body>
</soap:Envelope>"#
        )
    }

    #[test]
    fn extracts_all_catalog_names() {
        let xml = rowset_response(
            "<row><CATALOG_NAME>Sales</CATALOG_NAME></row>\
             <row><CATALOG_NAME>Inventory</CATALOG_NAME></row>",
        );
        let values = rowset_values(&xml, b"CATALOG_NAME").expect("parse should succeed");
        assert_eq!(values, vec!["Sales", "Inventory"]);
    }

    #[test]
    fn zero_elements_is_empty_not_error() {
        let xml = rowset_response("");
        let values = rowset_values(&xml, b"CATALOG_NAME").expect("parse should succeed");
        assert!(values.is_empty());
    }

    #[test]
    fn unescapes_text_content() {
        let xml = rowset_response("<row><CUBE_NAME>P&amp;L</CUBE_NAME></row>");
        let values = rowset_values(&xml, b"CUBE_NAME").expect("parse should succeed");
        assert_eq!(values, vec!["P&L"]);
    }

    #[test]
    fn ignores_same_name_outside_rowset_namespace() {
        let xml = r#"<?xml version="1.0"?>
<root xmlns:other="urn:not-the-rowset">
  <other:CATALOG_NAME>Decoy</other:CATALOG_NAME>
  <real xmlns="urn:schemas-microsoft-com:xml-analysis:rowset">
    <CATALOG_NAME>Sales</CATALOG_NAME>
  </real>
</root>"#;
        let values = rowset_values(xml, b"CATALOG_NAME").expect("parse should succeed");
        assert_eq!(values, vec!["Sales"]);
    }

    #[test]
    fn malformed_document_downgrades_to_empty() {
        let values = lenient_rowset_values("<unclosed", b"CATALOG_NAME", "catalog listing");
        assert!(values.is_empty());
    }

    #[test]
    fn cube_envelope_escapes_catalog_name() {
        let envelope = cube_statement_envelope("A&B <Test>");
        assert!(envelope.contains("<Catalog>A&amp;B &lt;Test&gt;</Catalog>"));
        assert!(!envelope.contains("<Catalog>A&B"));
    }

    #[test]
    fn plain_catalog_name_passes_through() {
        let envelope = cube_statement_envelope("Sales");
        assert!(envelope.contains("<Catalog>Sales</Catalog>"));
        assert!(envelope.contains("SELECT [CUBE_NAME] from $system.MDSCHEMA_CUBES"));
    }
}
