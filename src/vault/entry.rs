//! Credential records and the projections handed to callers.
//!
//! `CredentialEntry` is the authoritative in-memory record and carries the
//! raw secret.  `MaskedView` is what every read path returns: the same
//! metadata with the secret replaced by its mask.  `EntryFields` is the
//! request shape for `add` and `update`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::Zeroizing;

use super::mask;
use crate::errors::{KeycraftError, Result};

/// One stored API key with its metadata.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialEntry {
    pub id: String,
    pub name: String,
    pub vendor: String,
    secret_value: Zeroizing<String>,
    pub base_url: Option<String>,
    pub doc_url: Option<String>,
    pub code_snippets: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialEntry {
    /// Build a fresh entry from validated fields.
    pub(crate) fn create(id: String, fields: EntryFields, now: DateTime<Utc>) -> Self {
        let mut entry = Self {
            id,
            name: String::new(),
            vendor: String::new(),
            secret_value: Zeroizing::new(String::new()),
            base_url: None,
            doc_url: None,
            code_snippets: None,
            tags: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        entry.apply(fields, now);
        entry
    }

    /// Rebuild an entry from its persisted parts.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: String,
        name: String,
        vendor: String,
        secret_value: Zeroizing<String>,
        base_url: Option<String>,
        doc_url: Option<String>,
        code_snippets: Option<String>,
        tags: Option<String>,
        notes: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            vendor,
            secret_value,
            base_url,
            doc_url,
            code_snippets,
            tags,
            notes,
            created_at,
            updated_at,
        }
    }

    /// Overwrite every mutable field. `id` and `created_at` are untouched.
    pub(crate) fn apply(&mut self, fields: EntryFields, now: DateTime<Utc>) {
        self.name = fields.name;
        self.vendor = fields.vendor;
        self.secret_value = fields.secret_value;
        self.base_url = fields.base_url;
        self.doc_url = fields.doc_url;
        self.code_snippets = fields.code_snippets;
        self.tags = fields.tags;
        self.notes = fields.notes;
        self.updated_at = now;
    }

    /// The raw secret. Only the persistence log and `reveal` read this.
    pub(crate) fn secret_value(&self) -> &str {
        &self.secret_value
    }

    /// Project this entry for display.
    pub fn masked(&self) -> MaskedView {
        MaskedView {
            id: self.id.clone(),
            name: self.name.clone(),
            vendor: self.vendor.clone(),
            masked_value: mask::mask(&self.secret_value),
            base_url: self.base_url.clone(),
            doc_url: self.doc_url.clone(),
            code_snippets: self.code_snippets.clone(),
            tags: self.tags.clone(),
            notes: self.notes.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl fmt::Debug for CredentialEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialEntry")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("vendor", &self.vendor)
            .field("secret_value", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}

/// Redacted projection of an entry, safe to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedView {
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub masked_value: String,
    pub base_url: Option<String>,
    pub doc_url: Option<String>,
    pub code_snippets: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for `add` and `update`.
///
/// Missing fields deserialize as empty so that validation, not the
/// decoder, names the offending field.
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct EntryFields {
    pub name: String,
    pub vendor: String,
    pub secret_value: Zeroizing<String>,
    pub base_url: Option<String>,
    pub doc_url: Option<String>,
    pub code_snippets: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
}

impl fmt::Debug for EntryFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryFields")
            .field("name", &self.name)
            .field("vendor", &self.vendor)
            .field("secret_value", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("doc_url", &self.doc_url)
            .finish_non_exhaustive()
    }
}

impl EntryFields {
    /// Required fields only; optional ones can be set directly afterwards.
    pub fn new(name: &str, vendor: &str, secret_value: &str) -> Self {
        Self {
            name: name.to_string(),
            vendor: vendor.to_string(),
            secret_value: Zeroizing::new(secret_value.to_string()),
            ..Self::default()
        }
    }

    /// Check and normalize the fields.
    ///
    /// Checks run in the order name, vendor, secret_value, base_url,
    /// doc_url; the first failure is reported.  On success display strings
    /// are trimmed, tags are normalized and blank optionals become `None`.
    /// The secret itself is stored exactly as given.
    pub fn validate(self) -> Result<Self> {
        let name = required(self.name, "name")?;
        let vendor = required(self.vendor, "vendor")?;
        if !mask::looks_like_secret(&self.secret_value) {
            return Err(KeycraftError::invalid("secret_value"));
        }
        let base_url = url_field(self.base_url, "base_url")?;
        let doc_url = url_field(self.doc_url, "doc_url")?;

        Ok(Self {
            name,
            vendor,
            secret_value: self.secret_value,
            base_url,
            doc_url,
            code_snippets: non_blank(self.code_snippets),
            tags: normalize_tags(self.tags),
            notes: non_blank(self.notes),
        })
    }
}

fn required(value: String, field: &'static str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(KeycraftError::invalid(field));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Only absolute `http`/`https` URLs with a host are accepted.
fn url_field(value: Option<String>, field: &'static str) -> Result<Option<String>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            Ok(Some(trimmed.to_string()))
        }
        _ => Err(KeycraftError::invalid(field)),
    }
}

/// "  openai, prod ,,llm " -> "openai, prod, llm"
fn normalize_tags(tags: Option<String>) -> Option<String> {
    let joined = tags?
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    (!joined.is_empty()).then_some(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: KeycraftError) -> &'static str {
        match err {
            KeycraftError::Validation { field } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn first_offending_field_is_reported() {
        let fields = EntryFields::new("", "", "");
        assert_eq!(field_of(fields.validate().unwrap_err()), "name");

        let fields = EntryFields::new("Prod", " ", "");
        assert_eq!(field_of(fields.validate().unwrap_err()), "vendor");

        let fields = EntryFields::new("Prod", "OpenAI", "   ");
        assert_eq!(field_of(fields.validate().unwrap_err()), "secret_value");
    }

    #[test]
    fn urls_are_checked_after_required_fields() {
        let mut fields = EntryFields::new("Prod", "OpenAI", "sk-1");
        fields.base_url = Some("not a url".into());
        fields.doc_url = Some("also bad".into());
        assert_eq!(field_of(fields.validate().unwrap_err()), "base_url");

        let mut fields = EntryFields::new("Prod", "OpenAI", "sk-1");
        fields.doc_url = Some("ftp://docs.example.com".into());
        assert_eq!(field_of(fields.validate().unwrap_err()), "doc_url");
    }

    #[test]
    fn valid_urls_pass() {
        let mut fields = EntryFields::new("Prod", "OpenAI", "sk-1");
        fields.base_url = Some(" https://api.openai.com/v1 ".into());
        fields.doc_url = Some("http://localhost:8080/docs".into());
        let ok = fields.validate().unwrap();
        assert_eq!(ok.base_url.as_deref(), Some("https://api.openai.com/v1"));
        assert_eq!(ok.doc_url.as_deref(), Some("http://localhost:8080/docs"));
    }

    #[test]
    fn normalizes_display_fields() {
        let mut fields = EntryFields::new("  Prod ", "OpenAI\n", " sk-1 ");
        fields.tags = Some("  openai, prod ,,llm ".into());
        fields.notes = Some("   ".into());
        fields.base_url = Some(String::new());
        let ok = fields.validate().unwrap();
        assert_eq!(ok.name, "Prod");
        assert_eq!(ok.vendor, "OpenAI");
        assert_eq!(ok.secret_value.as_str(), " sk-1 ");
        assert_eq!(ok.tags.as_deref(), Some("openai, prod, llm"));
        assert!(ok.notes.is_none());
        assert!(ok.base_url.is_none());
    }

    #[test]
    fn debug_output_never_shows_secret() {
        let fields = EntryFields::new("Prod", "OpenAI", "sk-very-secret-value");
        let entry = CredentialEntry::create("id-1".into(), fields.clone(), Utc::now());
        assert!(!format!("{fields:?}").contains("sk-very-secret-value"));
        assert!(!format!("{entry:?}").contains("sk-very-secret-value"));
    }

    #[test]
    fn masked_view_carries_metadata() {
        let mut fields = EntryFields::new("Prod", "OpenAI", "sk-ABCDEFGH1234");
        fields.notes = Some("billing account".into());
        let now = Utc::now();
        let view = CredentialEntry::create("id-1".into(), fields, now).masked();
        assert_eq!(view.masked_value, "sk-A...1234");
        assert_eq!(view.notes.as_deref(), Some("billing account"));
        assert_eq!(view.created_at, now);
        assert_eq!(view.updated_at, now);
    }
}
