//! Loads per-service routing definition documents from a directory.
//!
//! Every document is parsed independently and reported as its own
//! [`DocumentOutcome`]; one corrupt file never aborts the scan. Files are
//! visited in sorted-name order and entries within a file in document order,
//! so the resulting registry (and therefore the rendered output) is
//! reproducible across runs.
use std::path::{Path, PathBuf};

use eyre::{Context, Result};
use serde_yaml::Value;

use crate::registry::{DefinitionFileError, DocumentOutcome, ServiceSpec};

const DEFINITION_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Scan `dir` and parse every definition document found in it.
///
/// Only the directory scan itself is fallible here; per-file failures are
/// folded into the returned outcomes for the registry builder to log and
/// skip.
pub fn load_documents(dir: &Path) -> Result<Vec<DocumentOutcome>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to scan definitions directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| DEFINITION_EXTENSIONS.contains(&ext))
        })
        .collect();
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| {
            let outcome = parse_document(&path);
            (path, outcome)
        })
        .collect())
}

/// Parse one document into its service entries, preserving document order.
fn parse_document(path: &Path) -> Result<Vec<(String, ServiceSpec)>, DefinitionFileError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| DefinitionFileError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

    let value: Value =
        serde_yaml::from_str(&contents).map_err(|source| DefinitionFileError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        // An empty document is a valid, if pointless, definition file.
        Value::Null => return Ok(vec![]),
        _ => {
            return Err(DefinitionFileError::NotAMapping {
                path: path.to_path_buf(),
            });
        }
    };

    let mut services = Vec::with_capacity(mapping.len());
    for (key, entry) in mapping {
        let name = match key {
            Value::String(name) => name,
            _ => {
                return Err(DefinitionFileError::NotAMapping {
                    path: path.to_path_buf(),
                });
            }
        };
        let spec: ServiceSpec = serde_yaml::from_value(entry).map_err(|source| {
            DefinitionFileError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        services.push((name, spec));
    }
    Ok(services)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn files_sorted_entries_in_document_order() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("20-web.yaml"),
            "web:\n  domain_name: www.example.com\n  backends:\n    - {host: w1, port: 80}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("10-api.yaml"),
            "api:\n  domain_name: api.example.com\n  backends:\n    - {host: a1, port: 80}\n\
             admin:\n  domain_name: admin.example.com\n  backends:\n    - {host: a2, port: 80}\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);

        let names: Vec<String> = docs
            .iter()
            .flat_map(|(_, outcome)| outcome.as_ref().unwrap().iter())
            .map(|(name, _)| name.clone())
            .collect();
        assert_eq!(names, ["api", "admin", "web"]);
    }

    #[test]
    fn malformed_file_reported_not_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.yaml"), "{unbalanced").unwrap();
        fs::write(
            dir.path().join("good.yaml"),
            "web:\n  domain_name: www.example.com\n  backends:\n    - {host: w1, port: 80}\n",
        )
        .unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].1.is_err());
        assert!(docs[1].1.is_ok());
    }

    #[test]
    fn scalar_document_is_not_a_mapping() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("scalar.yaml"), "just a string").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        match &docs[0].1 {
            Err(DefinitionFileError::NotAMapping { .. }) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn empty_document_yields_no_services() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty.yaml"), "").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert!(docs[0].1.as_ref().unwrap().is_empty());
    }
}
