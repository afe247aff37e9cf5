// src/core/properties.rs

//! Serializes the operator's selection into the `systems.properties` file the
//! external harness reads. The output is a pure function of the selection and
//! the settings document: no timestamps, byte-identical across repeated calls
//! with unchanged inputs. The target file is truncated and rewritten in full
//! every time, never patched.

use crate::constants::{JDBC_PORT, POSTGRES_PORT, XMLA_AUTH_PORT, XMLA_PORT};
use crate::models::{CatalogCubePair, FileAssignments, Settings};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PropertiesError {
    #[error("no catalog/cube pairs selected")]
    EmptySelection,
    #[error("could not write properties file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders and writes the properties document. Creates the parent directory
/// if absent.
pub fn write(
    path: &Path,
    pairs: &[CatalogCubePair],
    settings: &Settings,
    assignments: Option<&FileAssignments>,
) -> Result<(), PropertiesError> {
    let rendered = render(pairs, settings, assignments)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| PropertiesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, rendered).map_err(|source| PropertiesError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Renders the full document as a string. Fails only on an empty selection.
pub fn render(
    pairs: &[CatalogCubePair],
    settings: &Settings,
    assignments: Option<&FileAssignments>,
) -> Result<String, PropertiesError> {
    if pairs.is_empty() {
        return Err(PropertiesError::EmptySelection);
    }
    let csv_mode = assignments.is_some_and(|a| !a.is_empty());

    let mut lines: Vec<String> = Vec::new();
    if csv_mode {
        lines.push("# CSV Mode - Executors will read from CSV files".into());
        lines.push("atscale.schema.type=ingestion".into());
    } else {
        lines.push("# Live Mode - Executors will make live JDBC/XMLA calls".into());
        lines.push("atscale.schema.type=installer".into());
    }
    lines.push(format!("atscale.models={}", distinct_catalogs(pairs).join(", ")));

    for pair in pairs {
        let key = pair.cube_key();
        let assignment = assignments.and_then(|a| a.for_pair(pair));

        lines.push(format!("# {pair}"));
        lines.push(format!(
            "atscale.{key}.jdbc.url=jdbc:postgresql://{}:{JDBC_PORT}/{}",
            settings.host,
            pair.catalog_url_segment()
        ));
        lines.push(format!("atscale.{key}.jdbc.username={}", settings.username));
        lines.push(format!("atscale.{key}.jdbc.password={}", settings.password));
        lines.push(format!("atscale.{key}.jdbc.maxPoolSize=10"));
        lines.push(format!("atscale.{key}.jdbc.log.resultset.rows=true"));
        if let Some(assignment) = assignment
            && !assignment.jdbc_file.is_empty()
        {
            lines.push(format!(
                "atscale.{key}.jdbc.setIngestionFileName={}",
                assignment.jdbc_file
            ));
            lines.push(format!(
                "atscale.{key}.jdbc.setIngestionFileHasHeader={}",
                assignment.jdbc_has_header
            ));
        }

        lines.push(format!(
            "atscale.{key}.xmla.auth.url=https://{}:{XMLA_AUTH_PORT}/default/auth",
            settings.host
        ));
        lines.push(format!(
            "atscale.{key}.xmla.url=https://{}:{XMLA_PORT}/xmla/default/{}",
            settings.host, settings.token
        ));
        lines.push(format!("atscale.{key}.xmla.cube={}", pair.cube));
        lines.push(format!("atscale.{key}.xmla.catalog={}", pair.catalog));
        lines.push(format!("atscale.{key}.xmla.log.responsebody=true"));
        lines.push(format!("atscale.{key}.xmla.auth.username={}", settings.username));
        lines.push(format!("atscale.{key}.xmla.auth.password={}", settings.password));
        if let Some(assignment) = assignment
            && !assignment.xmla_file.is_empty()
        {
            lines.push(format!(
                "atscale.{key}.xmla.setIngestionFileName={}",
                assignment.xmla_file
            ));
            lines.push(format!(
                "atscale.{key}.xmla.setIngestionFileHasHeader={}",
                assignment.xmla_has_header
            ));
        }
        lines.push("# ".into());
    }

    lines.push(format!(
        "atscale.postgres.jdbc.url=jdbc:postgresql://{}:{POSTGRES_PORT}/atscale",
        settings.postgres_host
    ));
    lines.push("atscale.postgres.jdbc.username=atscale".into());
    lines.push("atscale.postgres.jdbc.password=atscale".into());

    lines.push("#System Parameter".into());
    lines.push("atscale.gatling.throttle.ms=5".into());
    lines.push("atscale.xmla.maxConnectionsPerHost=20".into());
    lines.push("atscale.xmla.useAggregates=true".into());
    lines.push("atscale.xmla.generateAggregates=false".into());
    lines.push("atscale.xmla.useQueryCache=false".into());
    lines.push("atscale.xmla.useAggregateCache=true".into());
    lines.push("atscale.jdbc.useAggregates=true".into());
    lines.push("atscale.jdbc.generateAggregates=false".into());
    lines.push("atscale.jdbc.useLocalCache=false".into());

    push_if_set(&mut lines, "aws.region", &settings.aws_region);
    push_if_set(&mut lines, "aws.secrets-key", &settings.aws_secrets_key);

    push_if_set(&mut lines, "snowflake.archive.account", &settings.snowflake_account);
    push_if_set(&mut lines, "snowflake.archive.warehouse", &settings.snowflake_warehouse);
    push_if_set(&mut lines, "snowflake.archive.database", &settings.snowflake_database);
    push_if_set(&mut lines, "snowflake.archive.schema", &settings.snowflake_schema);
    push_if_set(&mut lines, "snowflake.archive.role", &settings.snowflake_role);
    push_if_set(&mut lines, "snowflake.archive.username", &settings.snowflake_username);
    push_if_set(&mut lines, "snowflake.archive.password", &settings.snowflake_password);
    push_if_set(&mut lines, "snowflake.archive.token", &settings.snowflake_token);

    Ok(lines.join("\n") + "\n")
}

fn push_if_set(lines: &mut Vec<String>, property: &str, value: &str) {
    if !value.is_empty() {
        lines.push(format!("{property}={value}"));
    }
}

/// Distinct catalogs in first-occurrence order.
fn distinct_catalogs(pairs: &[CatalogCubePair]) -> Vec<&str> {
    let mut catalogs: Vec<&str> = Vec::new();
    for pair in pairs {
        if !catalogs.contains(&pair.catalog.as_str()) {
            catalogs.push(&pair.catalog);
        }
    }
    catalogs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileAssignment;

    fn test_settings() -> Settings {
        Settings {
            host: "h".into(),
            username: "u".into(),
            password: "p".into(),
            token: "t".into(),
            postgres_host: "pg".into(),
            ..Default::default()
        }
    }

    #[test]
    fn live_mode_end_to_end() {
        let pairs = vec![CatalogCubePair::new("Cat1", "CubeA")];
        let out = render(&pairs, &test_settings(), None).expect("render should succeed");
        assert!(out.contains("atscale.schema.type=installer"));
        assert!(out.contains("atscale.models=Cat1\n"));
        assert!(out.contains("atscale.CubeA.jdbc.url=jdbc:postgresql://h:15432/Cat1\n"));
        assert!(out.contains("atscale.CubeA.xmla.url=https://h:10502/xmla/default/t\n"));
        assert!(out.contains("atscale.CubeA.xmla.auth.url=https://h:10500/default/auth\n"));
        assert!(out.contains("atscale.postgres.jdbc.url=jdbc:postgresql://pg:10520/atscale\n"));
        assert!(out.contains("atscale.CubeA.xmla.cube=CubeA\n"));
        assert!(out.contains("atscale.CubeA.xmla.catalog=Cat1\n"));
    }

    #[test]
    fn models_line_lists_distinct_catalogs_in_first_occurrence_order() {
        let pairs = vec![
            CatalogCubePair::new("Sales", "A"),
            CatalogCubePair::new("Ops", "B"),
            CatalogCubePair::new("Sales", "C"),
        ];
        let out = render(&pairs, &test_settings(), None).expect("render should succeed");
        let models_lines: Vec<&str> = out
            .lines()
            .filter(|l| l.starts_with("atscale.models="))
            .collect();
        assert_eq!(models_lines, vec!["atscale.models=Sales, Ops"]);
    }

    #[test]
    fn identifiers_are_sanitized() {
        let pairs = vec![CatalogCubePair::new("Big Sales", "Revenue Cube")];
        let out = render(&pairs, &test_settings(), None).expect("render should succeed");
        assert!(out.contains("atscale.Revenue_Cube.jdbc.url=jdbc:postgresql://h:15432/Big%20Sales\n"));
        assert!(out.contains("atscale.Revenue_Cube.xmla.cube=Revenue Cube\n"));
        assert!(out.contains("atscale.Revenue_Cube.xmla.catalog=Big Sales\n"));
    }

    #[test]
    fn render_is_idempotent() {
        let pairs = vec![
            CatalogCubePair::new("Cat1", "CubeA"),
            CatalogCubePair::new("Cat2", "CubeB"),
        ];
        let settings = test_settings();
        let first = render(&pairs, &settings, None).expect("render should succeed");
        let second = render(&pairs, &settings, None).expect("render should succeed");
        assert_eq!(first, second);
    }

    #[test]
    fn write_is_byte_identical_across_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config").join("systems.properties");
        let pairs = vec![CatalogCubePair::new("Cat1", "CubeA")];
        let settings = test_settings();
        write(&path, &pairs, &settings, None).expect("first write");
        let first = fs::read(&path).expect("read back");
        write(&path, &pairs, &settings, None).expect("second write");
        let second = fs::read(&path).expect("read back");
        assert_eq!(first, second);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let err = render(&[], &test_settings(), None).unwrap_err();
        assert!(matches!(err, PropertiesError::EmptySelection));
    }

    #[test]
    fn csv_assignment_switches_to_ingestion_mode() {
        let pair = CatalogCubePair::new("Cat1", "CubeA");
        let mut assignments = FileAssignments::default();
        assignments.insert(
            &pair,
            FileAssignment {
                jdbc_file: "sales.csv".into(),
                ..Default::default()
            },
        );
        let out = render(&[pair], &test_settings(), Some(&assignments))
            .expect("render should succeed");
        assert!(out.contains("atscale.schema.type=ingestion"));
        assert!(out.contains("atscale.CubeA.jdbc.setIngestionFileName=sales.csv\n"));
        assert!(out.contains("atscale.CubeA.jdbc.setIngestionFileHasHeader=true\n"));
        // No XMLA fixture was assigned, so no XMLA ingestion lines.
        assert!(!out.contains("atscale.CubeA.xmla.setIngestionFileName"));
    }

    #[test]
    fn empty_assignment_map_stays_in_live_mode() {
        let pairs = vec![CatalogCubePair::new("Cat1", "CubeA")];
        let assignments = FileAssignments::default();
        let out = render(&pairs, &test_settings(), Some(&assignments))
            .expect("render should succeed");
        assert!(out.contains("atscale.schema.type=installer"));
    }

    #[test]
    fn optional_blocks_follow_configured_values() {
        let pairs = vec![CatalogCubePair::new("Cat1", "CubeA")];
        let mut settings = test_settings();
        let bare = render(&pairs, &settings, None).expect("render should succeed");
        assert!(!bare.contains("aws.region="));
        assert!(!bare.contains("snowflake.archive."));

        settings.aws_region = "us-east-1".into();
        settings.snowflake_account = "acme".into();
        settings.snowflake_password = "sf-secret".into();
        let full = render(&pairs, &settings, None).expect("render should succeed");
        assert!(full.contains("aws.region=us-east-1\n"));
        assert!(full.contains("snowflake.archive.account=acme\n"));
        assert!(full.contains("snowflake.archive.password=sf-secret\n"));
        assert!(!full.contains("snowflake.archive.warehouse="));
    }
}
