//! Artifact registry
//!
//! Deduplicated, categorized record of everything discovered during a crawl.
//! Each category is a set keyed by value; the first discovery of a value keeps
//! its source and context. Workers only ever add; the full contents are copied
//! out once the crawl has finished.

mod classify;

pub use classify::{categorize, response_category};
pub(crate) use classify::{is_api_shaped, is_graphql_path};

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Artifact buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactCategory {
    Pages,
    ApiEndpoints,
    GraphqlEndpoints,
    WebsocketEndpoints,
    SseEndpoints,
    Manifests,
    OpenapiDocs,
    Parameters,
    SourceFiles,
    Forms,
    Inputs,
    Directories,
    Files,
    Subdomains,
    Emails,
    AppRoutes,
}

impl ArtifactCategory {
    /// Every category, in report order
    pub const ALL: [ArtifactCategory; 16] = [
        Self::Pages,
        Self::ApiEndpoints,
        Self::GraphqlEndpoints,
        Self::WebsocketEndpoints,
        Self::SseEndpoints,
        Self::Manifests,
        Self::OpenapiDocs,
        Self::Parameters,
        Self::SourceFiles,
        Self::Forms,
        Self::Inputs,
        Self::Directories,
        Self::Files,
        Self::Subdomains,
        Self::Emails,
        Self::AppRoutes,
    ];

    /// Converts to the report key
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pages => "pages",
            Self::ApiEndpoints => "api_endpoints",
            Self::GraphqlEndpoints => "graphql_endpoints",
            Self::WebsocketEndpoints => "websocket_endpoints",
            Self::SseEndpoints => "sse_endpoints",
            Self::Manifests => "manifests",
            Self::OpenapiDocs => "openapi_docs",
            Self::Parameters => "parameters",
            Self::SourceFiles => "source_files",
            Self::Forms => "forms",
            Self::Inputs => "inputs",
            Self::Directories => "directories",
            Self::Files => "files",
            Self::Subdomains => "subdomains",
            Self::Emails => "emails",
            Self::AppRoutes => "app_routes",
        }
    }
}

impl fmt::Display for ArtifactCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactEntry {
    pub value: String,
    /// URL of the document the artifact was first found in
    pub source: String,
    /// Where in that document (e.g. `a[href]`, `script:fetch`, `sitemap`)
    pub context: String,
}

/// A named form control
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormInput {
    /// Element name: input, select, textarea or button
    pub element: String,
    pub name: String,
    /// The `type` attribute, defaulting to `text` for inputs
    #[serde(rename = "type")]
    pub input_type: String,
}

/// A form found in a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormRecord {
    /// Upper-cased method, GET when absent
    pub method: String,
    /// Canonical action URL, the page URL when absent
    pub action: String,
    pub inputs: Vec<FormInput>,
}

impl FormRecord {
    /// Deduplication key: method and action
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.action)
    }
}

#[derive(Debug, Clone)]
struct Provenance {
    source: String,
    context: String,
}

#[derive(Debug, Default)]
struct RegistryInner {
    buckets: HashMap<ArtifactCategory, BTreeMap<String, Provenance>>,
    forms: BTreeMap<String, FormRecord>,
}

/// Point-in-time copy of the registry
#[derive(Debug, Clone, Default)]
pub struct ArtifactSnapshot {
    /// Every category, each sorted by value
    pub artifacts: BTreeMap<ArtifactCategory, Vec<ArtifactEntry>>,
    pub forms: Vec<FormRecord>,
}

/// Thread-safe deduplicating artifact store
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    inner: Mutex<RegistryInner>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records a value in a category
    ///
    /// # Returns
    ///
    /// * `true` - The value was new to this category
    /// * `false` - It was already present; the earlier provenance is kept
    pub fn record(
        &self,
        category: ArtifactCategory,
        value: impl Into<String>,
        source: &str,
        context: &str,
    ) -> bool {
        let value = value.into();
        if value.is_empty() {
            return false;
        }

        let mut inner = self.lock();
        let bucket = inner.buckets.entry(category).or_default();
        if bucket.contains_key(&value) {
            return false;
        }

        bucket.insert(
            value,
            Provenance {
                source: source.to_string(),
                context: context.to_string(),
            },
        );
        true
    }

    /// Records a form; its key goes to `forms` and its input names to `inputs`
    ///
    /// Returns true if the form was new.
    pub fn record_form(&self, form: FormRecord, source: &str) -> bool {
        let key = form.key();
        let inputs: Vec<(String, String)> = form
            .inputs
            .iter()
            .map(|i| (i.name.clone(), format!("{}:{}", i.element, i.input_type)))
            .collect();

        {
            let mut inner = self.lock();
            if inner.forms.contains_key(&key) {
                return false;
            }
            inner.forms.insert(key.clone(), form);
        }

        self.record(ArtifactCategory::Forms, key, source, "form");
        for (name, kind) in inputs {
            self.record(ArtifactCategory::Inputs, name, source, &kind);
        }
        true
    }

    /// Returns true if `value` is recorded under `category`
    pub fn contains(&self, category: ArtifactCategory, value: &str) -> bool {
        self.lock()
            .buckets
            .get(&category)
            .is_some_and(|bucket| bucket.contains_key(value))
    }

    /// Number of values recorded under `category`
    pub fn count(&self, category: ArtifactCategory) -> usize {
        self.lock().buckets.get(&category).map_or(0, |b| b.len())
    }

    /// Copies the registry contents, including empty categories
    pub fn snapshot(&self) -> ArtifactSnapshot {
        let inner = self.lock();

        let artifacts = ArtifactCategory::ALL
            .iter()
            .map(|category| {
                let entries = inner
                    .buckets
                    .get(category)
                    .map(|bucket| {
                        bucket
                            .iter()
                            .map(|(value, provenance)| ArtifactEntry {
                                value: value.clone(),
                                source: provenance.source.clone(),
                                context: provenance.context.clone(),
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                (*category, entries)
            })
            .collect();

        ArtifactSnapshot {
            artifacts,
            forms: inner.forms.values().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_deduplicates() {
        let registry = ArtifactRegistry::new();
        assert!(registry.record(ArtifactCategory::Pages, "https://example.com/a", "https://example.com/", "a[href]"));
        assert!(!registry.record(ArtifactCategory::Pages, "https://example.com/a", "https://example.com/b", "sitemap"));
        assert_eq!(registry.count(ArtifactCategory::Pages), 1);
    }

    #[test]
    fn test_first_provenance_wins() {
        let registry = ArtifactRegistry::new();
        registry.record(ArtifactCategory::Emails, "a@example.com", "https://example.com/1", "text");
        registry.record(ArtifactCategory::Emails, "a@example.com", "https://example.com/2", "script");

        let snapshot = registry.snapshot();
        let emails = &snapshot.artifacts[&ArtifactCategory::Emails];
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].source, "https://example.com/1");
        assert_eq!(emails[0].context, "text");
    }

    #[test]
    fn test_same_value_different_categories() {
        let registry = ArtifactRegistry::new();
        assert!(registry.record(ArtifactCategory::Pages, "x", "s", "c"));
        assert!(registry.record(ArtifactCategory::Files, "x", "s", "c"));
        assert!(registry.contains(ArtifactCategory::Pages, "x"));
        assert!(registry.contains(ArtifactCategory::Files, "x"));
        assert!(!registry.contains(ArtifactCategory::Directories, "x"));
    }

    #[test]
    fn test_empty_value_ignored() {
        let registry = ArtifactRegistry::new();
        assert!(!registry.record(ArtifactCategory::Parameters, "", "s", "c"));
        assert_eq!(registry.count(ArtifactCategory::Parameters), 0);
    }

    #[test]
    fn test_record_form() {
        let registry = ArtifactRegistry::new();
        let form = FormRecord {
            method: "POST".to_string(),
            action: "https://example.com/login".to_string(),
            inputs: vec![
                FormInput {
                    element: "input".to_string(),
                    name: "user".to_string(),
                    input_type: "text".to_string(),
                },
                FormInput {
                    element: "input".to_string(),
                    name: "pass".to_string(),
                    input_type: "password".to_string(),
                },
            ],
        };

        assert!(registry.record_form(form.clone(), "https://example.com/"));
        assert!(!registry.record_form(form, "https://example.com/other"));

        assert!(registry.contains(ArtifactCategory::Forms, "POST https://example.com/login"));
        assert!(registry.contains(ArtifactCategory::Inputs, "user"));
        assert!(registry.contains(ArtifactCategory::Inputs, "pass"));
        assert_eq!(registry.snapshot().forms.len(), 1);
    }

    #[test]
    fn test_snapshot_has_every_category_sorted() {
        let registry = ArtifactRegistry::new();
        registry.record(ArtifactCategory::Pages, "https://example.com/b", "s", "c");
        registry.record(ArtifactCategory::Pages, "https://example.com/a", "s", "c");

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.artifacts.len(), ArtifactCategory::ALL.len());
        let pages: Vec<&str> = snapshot.artifacts[&ArtifactCategory::Pages]
            .iter()
            .map(|e| e.value.as_str())
            .collect();
        assert_eq!(pages, vec!["https://example.com/a", "https://example.com/b"]);
        assert!(snapshot.artifacts[&ArtifactCategory::SourceFiles].is_empty());
    }

    #[test]
    fn test_category_names() {
        assert_eq!(ArtifactCategory::ApiEndpoints.as_str(), "api_endpoints");
        assert_eq!(ArtifactCategory::SseEndpoints.to_string(), "sse_endpoints");
        assert_eq!(
            serde_json::to_string(&ArtifactCategory::OpenapiDocs).unwrap(),
            "\"openapi_docs\""
        );
    }

    #[test]
    fn test_concurrent_records() {
        use std::sync::Arc;

        let registry = Arc::new(ArtifactRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        registry.record(ArtifactCategory::Pages, format!("p{}", i), &format!("t{}", t), "c");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.count(ArtifactCategory::Pages), 100);
    }
}
