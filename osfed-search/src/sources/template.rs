//! OpenSearch URL template expansion.
//!
//! Placeholders look like `{searchTerms}` (required) or `{startIndex?}`
//! (optional), optionally namespaced as `{geo:box?}`. Each is replaced by
//! the form-urlencoded value of the parameter with the same name.

use url::Url;

use crate::error::SearchError;
use crate::params::QueryParameters;

/// Expand `template` with `params` and parse the result as a URL.
///
/// Missing parameters expand to the empty string.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] on an unterminated or empty placeholder
/// or when the expanded text is not a valid URL.
pub fn expand(template: &str, params: &QueryParameters) -> Result<Url, SearchError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| SearchError::Parse(format!("unterminated placeholder in {template}")))?;
        let placeholder = &after[..close];
        if placeholder.contains('{') {
            return Err(SearchError::Parse(format!("nested placeholder in {template}")));
        }

        let (name, optional) = match placeholder.strip_suffix('?') {
            Some(name) => (name, true),
            None => (placeholder, false),
        };
        if name.is_empty() {
            return Err(SearchError::Parse(format!("empty placeholder in {template}")));
        }

        match params.get(name) {
            Some(value) => out.extend(url::form_urlencoded::byte_serialize(value.as_bytes())),
            None if !optional => {
                tracing::debug!(parameter = name, "required template parameter missing");
            }
            None => {}
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);

    Url::parse(&out).map_err(|e| SearchError::Parse(format!("invalid URL {out}: {e}")))
}
