//! Locates the embedded JSON payload in a tab page.
//!
//! The remote page carries its whole data model as a JSON string in one
//! attribute of one element. A page without that element, or with a payload
//! that does not parse as a JSON object, yields an empty object: downstream
//! normalization turns that into "not found".

use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::ExtractionError;

/// Element carrying the page's data model.
pub const STORE_SELECTOR: &str = "div.js-store";

/// Attribute of [`STORE_SELECTOR`] holding the serialized JSON.
pub const STORE_ATTRIBUTE: &str = "data-content";

#[derive(Debug, Clone)]
pub struct PayloadExtractor {
    selector: Selector,
    attribute: String,
}

impl PayloadExtractor {
    /// Build an extractor for an arbitrary element and attribute.
    pub fn new(css: &str, attribute: impl Into<String>) -> Result<Self, ExtractionError> {
        let selector = Selector::parse(css).map_err(|e| ExtractionError::Selector {
            selector: css.to_string(),
            message: format!("{e:?}"),
        })?;

        Ok(Self {
            selector,
            attribute: attribute.into(),
        })
    }

    /// The extractor for the remote tab site.
    pub fn store() -> Result<Self, ExtractionError> {
        Self::new(STORE_SELECTOR, STORE_ATTRIBUTE)
    }

    /// Extract the payload tree; never fails.
    pub fn extract(&self, html: &str) -> Value {
        let document = Html::parse_document(html);

        let Some(raw) = document
            .select(&self.selector)
            .find_map(|node| node.value().attr(&self.attribute))
        else {
            log::debug!("No payload element in document ({} bytes)", html.len());
            return empty_tree();
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(tree @ Value::Object(_)) => tree,
            Ok(other) => {
                log::debug!("Payload is not a JSON object: {other}");
                empty_tree()
            }
            Err(e) => {
                log::warn!("Unparseable page payload: {e}");
                empty_tree()
            }
        }
    }
}

fn empty_tree() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(attr: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><head><title>t</title></head>
            <body><div class="js-store" data-content="{attr}"></div></body></html>"#
        )
    }

    #[test]
    fn test_extracts_entity_encoded_payload() {
        let html = page("{&quot;store&quot;:{&quot;page&quot;:{&quot;data&quot;:{&quot;tab&quot;:{&quot;song_id&quot;:7}}}}}");
        let tree = PayloadExtractor::store().unwrap().extract(&html);
        assert_eq!(tree["store"]["page"]["data"]["tab"]["song_id"], 7);
    }

    #[test]
    fn test_missing_node_yields_empty_object() {
        let tree = PayloadExtractor::store()
            .unwrap()
            .extract("<html><body><p>moved</p></body></html>");
        assert_eq!(tree, serde_json::json!({}));
    }

    #[test]
    fn test_malformed_payload_yields_empty_object() {
        let tree = PayloadExtractor::store().unwrap().extract(&page("{not json"));
        assert_eq!(tree, serde_json::json!({}));
    }

    #[test]
    fn test_non_object_payload_yields_empty_object() {
        let tree = PayloadExtractor::store().unwrap().extract(&page("[1,2,3]"));
        assert_eq!(tree, serde_json::json!({}));
    }

    #[test]
    fn test_first_matching_node_wins() {
        let html = r#"<div class="js-store" data-content='{"a":1}'></div>
                      <div class="js-store" data-content='{"a":2}'></div>"#;
        let tree = PayloadExtractor::store().unwrap().extract(html);
        assert_eq!(tree["a"], 1);
    }

    #[test]
    fn test_invalid_selector_is_error() {
        let result = PayloadExtractor::new("div[", "data-content");
        assert!(matches!(result, Err(ExtractionError::Selector { .. })));
    }
}
