//! Source map parsing

use crate::ParseError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawSourceMap {
    #[serde(default)]
    sources: Vec<Option<String>>,
    #[serde(default, rename = "sourceRoot")]
    source_root: Option<String>,
}

/// Returns the original source paths listed by a source map
///
/// Paths are prefixed with `sourceRoot` when one is declared. A malformed map
/// yields an empty list.
pub fn parse_source_map(body: &[u8]) -> Vec<String> {
    match try_parse_source_map(body) {
        Ok(sources) => sources,
        Err(e) => {
            tracing::debug!("Ignoring malformed source map: {}", e);
            Vec::new()
        }
    }
}

fn try_parse_source_map(body: &[u8]) -> Result<Vec<String>, ParseError> {
    // Some servers prefix maps with an XSSI guard
    let body = body.strip_prefix(b")]}'".as_slice()).unwrap_or(body);
    let map: RawSourceMap = serde_json::from_slice(body)?;

    let root = map
        .source_root
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    Ok(map
        .sources
        .into_iter()
        .flatten()
        .map(|source| source.trim().to_string())
        .filter(|source| !source.is_empty())
        .map(|source| match root {
            Some(root) if !source.starts_with(root) => {
                format!("{}/{}", root.trim_end_matches('/'), source.trim_start_matches('/'))
            }
            _ => source,
        })
        .collect())
}
