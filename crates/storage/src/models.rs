//! Storage models.
//!
//! These types describe the parts of a container and its blobs that the
//! synchronizer reads and writes. Content itself is never modelled here; it
//! goes straight from the local file to the backend.

use crate::error::{Error, ErrorKind};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Public access level of a container.
///
/// Defaults to [`Private`](Self::Private), the most restrictive option.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ContainerAccess {
    /// No anonymous access.
    #[default]
    Private,
    /// Anonymous read access to blobs, but containers cannot be listed.
    Blob,
    /// Anonymous read access to blobs and container listings.
    Container,
}
impl FromStr for ContainerAccess {
    type Err = Error;

    /// Parses the Azure access names case-insensitively. The numeric values
    /// of the historical enumeration (`Off = 0`, `Container = 1`, `Blob = 2`)
    /// are accepted too, so existing pipeline definitions keep working.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" | "none" | "private" | "0" => Ok(Self::Private),
            "container" | "1" => Ok(Self::Container),
            "blob" | "2" => Ok(Self::Blob),
            _ => exn::bail!(ErrorKind::Configuration(format!("unrecognized container access `{s}`"))),
        }
    }
}
impl fmt::Display for ContainerAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Private => "private",
            Self::Blob => "blob",
            Self::Container => "container",
        })
    }
}

/// User-defined blob metadata.
///
/// Azure treats metadata names case-insensitively and SDKs tend to hand them
/// back lower-cased, so lookups ignore ASCII case. The name used on insert is
/// the one that gets written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Metadata(BTreeMap<String, String>);
impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(name, _)| name.eq_ignore_ascii_case(key)).map(|(_, value)| value.as_str())
    }

    /// Inserts a value, replacing any existing entry whose name differs only
    /// by case.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.0.retain(|name, _| !name.eq_ignore_ascii_case(&key));
        self.0.insert(key, value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Self::new();
        for (key, value) in iter {
            metadata.insert(key, value);
        }
        metadata
    }
}

/// System properties of a blob that the synchronizer manages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlobProperties {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
}
impl BlobProperties {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            content_encoding: None,
        }
    }

    /// Sets the content encoding, ignoring blank values.
    pub fn with_content_encoding(mut self, encoding: Option<impl AsRef<str>>) -> Self {
        self.content_encoding = encoding
            .map(|e| e.as_ref().trim().to_string())
            .filter(|e| !e.is_empty());
        self
    }
}

/// Attributes of an existing blob, as returned by a properties fetch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlobAttributes {
    /// Blob size in bytes.
    pub size: u64,
    pub properties: BlobProperties,
    pub metadata: Metadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Off", ContainerAccess::Private)]
    #[case("off", ContainerAccess::Private)]
    #[case("private", ContainerAccess::Private)]
    #[case("None", ContainerAccess::Private)]
    #[case("0", ContainerAccess::Private)]
    #[case("Blob", ContainerAccess::Blob)]
    #[case(" blob ", ContainerAccess::Blob)]
    #[case("2", ContainerAccess::Blob)]
    #[case("Container", ContainerAccess::Container)]
    #[case("CONTAINER", ContainerAccess::Container)]
    #[case("1", ContainerAccess::Container)]
    fn test_parse_access(#[case] input: &str, #[case] expected: ContainerAccess) {
        assert_eq!(input.parse::<ContainerAccess>().unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("public")]
    #[case("3")]
    #[case("blobs")]
    fn test_parse_access_invalid(#[case] input: &str) {
        let err = input.parse::<ContainerAccess>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Configuration(_)));
    }

    #[test]
    fn test_access_default_is_most_restrictive() {
        assert_eq!(ContainerAccess::default(), ContainerAccess::Private);
    }

    #[test]
    fn test_metadata_case_insensitive() {
        let mut metadata = Metadata::new();
        metadata.insert("LastModified", "100");
        assert_eq!(metadata.get("lastmodified"), Some("100"));
        assert_eq!(metadata.get("LASTMODIFIED"), Some("100"));
        metadata.insert("lastmodified", "200");
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.get("LastModified"), Some("200"));
        assert_eq!(metadata.iter().next(), Some(("lastmodified", "200")));
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("   "), None)]
    #[case(Some("gzip"), Some("gzip"))]
    #[case(Some(" br "), Some("br"))]
    fn test_content_encoding_ignores_blank(#[case] input: Option<&str>, #[case] expected: Option<&str>) {
        let properties = BlobProperties::new("text/html").with_content_encoding(input);
        assert_eq!(properties.content_encoding.as_deref(), expected);
        assert_eq!(properties.content_type.as_deref(), Some("text/html"));
    }
}
