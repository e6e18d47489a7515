//! Storage account connection strings.
//!
//! Parses the `Key=Value;Key=Value` format used by Azure Storage tooling into
//! validated credentials and a blob service endpoint. Only the blob service
//! is used; endpoints of the other services are accepted and ignored.

use crate::error::{Error, ErrorKind};
use std::fmt;
use std::str::FromStr;

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";
const DEVELOPMENT_ACCOUNT: &str = "devstoreaccount1";
const DEVELOPMENT_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// How requests to the storage account are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Shared key authorization with the account's access key.
    AccessKey { account: String, key: String },
    /// Shared access signature appended to every request.
    SharedAccessSignature(String),
    /// Local storage emulator (Azurite) with its well-known account.
    DevelopmentStorage,
}
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessKey { account, .. } => {
                f.debug_struct("AccessKey").field("account", account).field("key", &"<redacted>").finish()
            },
            Self::SharedAccessSignature(_) => f.debug_tuple("SharedAccessSignature").field(&"<redacted>").finish(),
            Self::DevelopmentStorage => f.write_str("DevelopmentStorage"),
        }
    }
}

/// A parsed and validated storage connection string.
///
/// # Examples
///
/// ```
/// use blobsync_storage::ConnectionString;
///
/// let connection: ConnectionString =
///     "DefaultEndpointsProtocol=https;AccountName=builds;AccountKey=c2VjcmV0".parse().unwrap();
/// assert_eq!(connection.account_name(), "builds");
/// assert_eq!(connection.blob_endpoint(), "https://builds.blob.core.windows.net");
///
/// assert!("AccountName=builds".parse::<ConnectionString>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectionString {
    account_name: Option<String>,
    credentials: Credentials,
    protocol: String,
    endpoint_suffix: String,
    blob_endpoint: Option<String>,
}
impl ConnectionString {
    /// Account name, or an empty string when only a SAS and an explicit blob
    /// endpoint were given.
    pub fn account_name(&self) -> &str {
        match (&self.credentials, &self.account_name) {
            (Credentials::DevelopmentStorage, _) => DEVELOPMENT_ACCOUNT,
            (_, Some(name)) => name,
            (_, None) => "",
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns `true` if the endpoint was given explicitly or differs from
    /// the public cloud defaults.
    pub fn has_custom_endpoint(&self) -> bool {
        self.blob_endpoint.is_some() || self.protocol != "https" || self.endpoint_suffix != DEFAULT_ENDPOINT_SUFFIX
    }

    /// Base URL of the blob service, without a trailing slash.
    pub fn blob_endpoint(&self) -> String {
        if let Some(endpoint) = &self.blob_endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }
        match self.credentials {
            Credentials::DevelopmentStorage => DEVELOPMENT_BLOB_ENDPOINT.to_string(),
            _ => format!("{}://{}.blob.{}", self.protocol, self.account_name(), self.endpoint_suffix),
        }
    }

    fn invalid(reason: impl Into<String>) -> Error {
        Error::from(ErrorKind::Configuration(reason.into()))
    }
}

/// Raw settings, before deciding which credential set applies.
#[derive(Default)]
struct Settings {
    protocol: Option<String>,
    account_name: Option<String>,
    account_key: Option<String>,
    sas: Option<String>,
    blob_endpoint: Option<String>,
    endpoint_suffix: Option<String>,
    development: Option<bool>,
}
impl Settings {
    fn set(slot: &mut Option<String>, key: &str, value: &str) -> Result<(), Error> {
        if slot.is_some() {
            return Err(ConnectionString::invalid(format!("duplicate setting `{key}`")));
        }
        *slot = Some(value.to_string());
        Ok(())
    }
}

impl FromStr for ConnectionString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(Self::invalid("connection string is empty"));
        }
        let mut settings = Settings::default();
        for segment in s.split(';').map(str::trim).filter(|segment| !segment.is_empty()) {
            // Values (keys, signatures) are base64 and may contain `=` padding.
            let Some((key, value)) = segment.split_once('=') else {
                return Err(Self::invalid(format!("setting `{segment}` has no value")));
            };
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                return Err(Self::invalid("setting with an empty name"));
            }
            match key.to_ascii_lowercase().as_str() {
                "defaultendpointsprotocol" => Settings::set(&mut settings.protocol, key, value)?,
                "accountname" => Settings::set(&mut settings.account_name, key, value)?,
                "accountkey" => Settings::set(&mut settings.account_key, key, value)?,
                "sharedaccesssignature" => Settings::set(&mut settings.sas, key, value)?,
                "blobendpoint" => Settings::set(&mut settings.blob_endpoint, key, value)?,
                "endpointsuffix" => Settings::set(&mut settings.endpoint_suffix, key, value)?,
                "usedevelopmentstorage" => {
                    if settings.development.is_some() {
                        return Err(Self::invalid(format!("duplicate setting `{key}`")));
                    }
                    let enabled = value
                        .parse::<bool>()
                        .or_else(|_| value.to_ascii_lowercase().parse::<bool>())
                        .map_err(|_| Self::invalid(format!("`{key}` must be true or false")))?;
                    settings.development = Some(enabled);
                },
                "queueendpoint" | "tableendpoint" | "fileendpoint" | "blobsecondaryendpoint"
                | "queuesecondaryendpoint" | "tablesecondaryendpoint" | "filesecondaryendpoint" => {
                    tracing::trace!(key, "Ignoring endpoint of an unused service");
                },
                _ => return Err(Self::invalid(format!("unknown setting `{key}`"))),
            }
        }

        let protocol = match settings.protocol.as_deref().map(str::to_ascii_lowercase) {
            None => "https".to_string(),
            Some(p) if p == "http" || p == "https" => p,
            Some(p) => return Err(Self::invalid(format!("unsupported protocol `{p}`"))),
        };
        if let Some(endpoint) = &settings.blob_endpoint {
            let lowered = endpoint.to_ascii_lowercase();
            let host = lowered.strip_prefix("https://").or_else(|| lowered.strip_prefix("http://"));
            if host.is_none_or(|host| host.trim_matches('/').is_empty()) {
                return Err(Self::invalid(format!("blob endpoint `{endpoint}` is not an http(s) URL")));
            }
        }
        let endpoint_suffix = settings
            .endpoint_suffix
            .map(|suffix| suffix.trim_matches('.').to_string())
            .filter(|suffix| !suffix.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT_SUFFIX.to_string());
        let account_name = settings.account_name.filter(|name| !name.is_empty());
        let account_key = settings.account_key.filter(|key| !key.is_empty());
        let sas = settings
            .sas
            .map(|sas| sas.trim_start_matches('?').to_string())
            .filter(|sas| !sas.is_empty());

        let credentials = if settings.development == Some(true) {
            if account_name.is_some() || account_key.is_some() || sas.is_some() {
                return Err(Self::invalid("development storage cannot be combined with account credentials"));
            }
            Credentials::DevelopmentStorage
        } else if let Some(key) = account_key {
            let Some(account) = account_name.clone() else {
                return Err(Self::invalid("`AccountKey` requires `AccountName`"));
            };
            if sas.is_some() {
                return Err(Self::invalid("`AccountKey` and `SharedAccessSignature` are mutually exclusive"));
            }
            Credentials::AccessKey { account, key }
        } else if let Some(sas) = sas {
            if account_name.is_none() && settings.blob_endpoint.is_none() {
                return Err(Self::invalid("`SharedAccessSignature` requires `AccountName` or `BlobEndpoint`"));
            }
            Credentials::SharedAccessSignature(sas)
        } else {
            return Err(Self::invalid("no credentials: expected `AccountKey`, `SharedAccessSignature` or `UseDevelopmentStorage=true`"));
        };

        Ok(Self {
            account_name,
            credentials,
            protocol,
            endpoint_suffix,
            blob_endpoint: settings.blob_endpoint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_account_key() {
        let connection: ConnectionString =
            "DefaultEndpointsProtocol=https;AccountName=artifacts;AccountKey=a2V5==;EndpointSuffix=core.windows.net"
                .parse()
                .unwrap();
        assert_eq!(connection.account_name(), "artifacts");
        assert_eq!(
            connection.credentials(),
            &Credentials::AccessKey {
                account: "artifacts".to_string(),
                key: "a2V5==".to_string()
            }
        );
        assert_eq!(connection.blob_endpoint(), "https://artifacts.blob.core.windows.net");
        assert!(!connection.has_custom_endpoint());
    }

    #[test]
    fn test_development_storage() {
        let connection: ConnectionString = "UseDevelopmentStorage=true".parse().unwrap();
        assert_eq!(connection.credentials(), &Credentials::DevelopmentStorage);
        assert_eq!(connection.account_name(), "devstoreaccount1");
        assert_eq!(connection.blob_endpoint(), "http://127.0.0.1:10000/devstoreaccount1");
    }

    #[test]
    fn test_sas_with_blob_endpoint() {
        let connection: ConnectionString =
            "BlobEndpoint=https://cdn.example.net/;SharedAccessSignature=?sv=2021-08-06&sig=abc%3D".parse().unwrap();
        assert_eq!(
            connection.credentials(),
            &Credentials::SharedAccessSignature("sv=2021-08-06&sig=abc%3D".to_string())
        );
        assert_eq!(connection.account_name(), "");
        assert_eq!(connection.blob_endpoint(), "https://cdn.example.net");
        assert!(connection.has_custom_endpoint());
    }

    #[test]
    fn test_portal_sas_connection_string() {
        let connection: ConnectionString = "BlobEndpoint=https://acct.blob.core.windows.net/;\
            QueueEndpoint=https://acct.queue.core.windows.net/;\
            FileEndpoint=https://acct.file.core.windows.net/;\
            TableEndpoint=https://acct.table.core.windows.net/;\
            SharedAccessSignature=sv=2022-11-02&ss=b&srt=co&sp=rwlac&sig=abc%3D"
            .parse()
            .unwrap();
        assert_eq!(
            connection.credentials(),
            &Credentials::SharedAccessSignature("sv=2022-11-02&ss=b&srt=co&sp=rwlac&sig=abc%3D".to_string())
        );
        assert_eq!(connection.blob_endpoint(), "https://acct.blob.core.windows.net");
    }

    #[test]
    fn test_secondary_endpoints_ignored() {
        let connection: ConnectionString =
            "AccountName=site;AccountKey=a2V5;BlobSecondaryEndpoint=https://site-secondary.blob.core.windows.net"
                .parse()
                .unwrap();
        assert_eq!(connection.blob_endpoint(), "https://site.blob.core.windows.net");
        assert!(!connection.has_custom_endpoint());
    }

    #[test]
    fn test_custom_suffix_and_protocol() {
        let connection: ConnectionString =
            "DefaultEndpointsProtocol=http;AccountName=china;AccountKey=a2V5;EndpointSuffix=core.chinacloudapi.cn"
                .parse()
                .unwrap();
        assert_eq!(connection.blob_endpoint(), "http://china.blob.core.chinacloudapi.cn");
        assert!(connection.has_custom_endpoint());
    }

    #[test]
    fn test_keys_are_case_insensitive_and_segments_trimmed() {
        let connection: ConnectionString = " accountname=site ; ACCOUNTKEY=a2V5 ;;".parse().unwrap();
        assert_eq!(connection.account_name(), "site");
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    #[case::no_credentials("AccountName=site")]
    #[case::key_without_account("AccountKey=a2V5")]
    #[case::no_value("AccountName=site;AccountKey")]
    #[case::empty_key("=value;AccountName=site;AccountKey=a2V5")]
    #[case::unknown("AccountName=site;AccountKey=a2V5;CacheEndpoint=https://c")]
    #[case::duplicate("AccountName=site;AccountName=other;AccountKey=a2V5")]
    #[case::protocol("DefaultEndpointsProtocol=ftp;AccountName=site;AccountKey=a2V5")]
    #[case::endpoint("BlobEndpoint=cdn.example.net;SharedAccessSignature=sig")]
    #[case::sas_without_target("SharedAccessSignature=sv=1&sig=2")]
    #[case::key_and_sas("AccountName=site;AccountKey=a2V5;SharedAccessSignature=sig")]
    #[case::development_false("UseDevelopmentStorage=false")]
    #[case::development_mixed("UseDevelopmentStorage=true;AccountName=site")]
    #[case::development_garbage("UseDevelopmentStorage=yes")]
    #[case::garbage("this is not a connection string")]
    fn test_invalid(#[case] input: &str) {
        let err = input.parse::<ConnectionString>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Configuration(_)), "{input}");
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let connection: ConnectionString = "AccountName=site;AccountKey=c3VwZXJzZWNyZXQ=".parse().unwrap();
        let debug = format!("{connection:?}");
        assert!(debug.contains("site"));
        assert!(!debug.contains("c3VwZXJzZWNyZXQ="));
    }
}
