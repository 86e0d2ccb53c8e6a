use super::{BlockHash, CheckpointError, CheckpointResult};
use crate::network::NetworkType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// One checkpoint as read from a source, not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub height: u64,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

/// Layout of the checkpoint JSON file:
/// `{"hashlines": [{"height": 1, "hash": "…"}, …]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckpointFile {
    pub hashlines: Vec<SourceRecord>,
}

/// Read checkpoint records from a JSON file.
///
/// A missing file is not an error and yields `Ok(None)`.
pub fn load_checkpoint_file(path: &Path) -> CheckpointResult<Option<Vec<SourceRecord>>> {
    if !path.exists() {
        log::debug!("Blockchain checkpoints file not found: {:?}", path);
        return Ok(None);
    }

    let unreadable = |reason: String| CheckpointError::SourceUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let data = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
    let file: CheckpointFile =
        serde_json::from_str(&data).map_err(|e| unreadable(e.to_string()))?;
    Ok(Some(file.hashlines))
}

/// Domains publishing `height:hash` TXT records for each network.
pub const MAINNET_DNS_URLS: &[&str] = &[];
pub const TESTNET_DNS_URLS: &[&str] = &[];
pub const STAGENET_DNS_URLS: &[&str] = &[
    "stagenetpoints1.dinastycoin.com",
    "stagenetpoints2.dinastycoin.com",
    "stagenetpoints3.dinastycoin.com",
    "stagenetpoints4.dinastycoin.com",
];

pub fn dns_urls(network: NetworkType) -> &'static [&'static str] {
    match network {
        NetworkType::Mainnet => MAINNET_DNS_URLS,
        NetworkType::Testnet => TESTNET_DNS_URLS,
        NetworkType::Stagenet => STAGENET_DNS_URLS,
    }
}

/// Parse a `height:hash` TXT record. Anything else yields `None`.
pub fn parse_dns_record(record: &str) -> Option<(u64, BlockHash)> {
    let (height, hash) = record.split_once(':')?;
    let height = height.trim_start().parse::<u64>().ok()?;
    let hash = hash.parse::<BlockHash>().ok()?;
    Some((height, hash))
}

/// Source of raw DNS TXT records.
pub trait TxtResolver: Send + Sync {
    /// Fetch TXT records for all `domains`. Fails with
    /// [`CheckpointError::NetworkUnavailable`] when no domain could be queried.
    fn resolve_txt(&self, domains: &[&str]) -> CheckpointResult<Vec<String>>;
}

/// Fixed set of TXT records, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTxtResolver {
    records: Vec<String>,
}

impl StaticTxtResolver {
    pub fn new<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            records: records.into_iter().map(Into::into).collect(),
        }
    }
}

impl TxtResolver for StaticTxtResolver {
    fn resolve_txt(&self, _domains: &[&str]) -> CheckpointResult<Vec<String>> {
        Ok(self.records.clone())
    }
}

/// DNS-over-HTTPS JSON answer (`application/dns-json`).
#[derive(Debug, Deserialize)]
struct DohResponse {
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DohAnswer>,
}

#[derive(Debug, Deserialize)]
struct DohAnswer {
    #[serde(rename = "type")]
    record_type: u16,
    data: String,
}

const DNS_TYPE_TXT: u16 = 16;

/// Resolves TXT records through a DNS-over-HTTPS JSON endpoint.
///
/// Records from every answering domain are merged and de-duplicated. The
/// lookup only fails when none of the domains answered.
pub struct DohTxtResolver {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl DohTxtResolver {
    pub const DEFAULT_ENDPOINT: &'static str = "https://cloudflare-dns.com/dns-query";

    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> CheckpointResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CheckpointError::NetworkUnavailable(e.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    fn query(&self, domain: &str) -> Result<Vec<String>, String> {
        let response: DohResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("name", domain), ("type", "TXT")])
            .header(reqwest::header::ACCEPT, "application/dns-json")
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?
            .json()
            .map_err(|e| e.to_string())?;

        if response.status != 0 {
            return Err(format!("DNS status {}", response.status));
        }

        Ok(response
            .answer
            .into_iter()
            .filter(|a| a.record_type == DNS_TYPE_TXT)
            .map(|a| unquote_txt(&a.data))
            .collect())
    }
}

impl TxtResolver for DohTxtResolver {
    fn resolve_txt(&self, domains: &[&str]) -> CheckpointResult<Vec<String>> {
        if domains.is_empty() {
            return Err(CheckpointError::NetworkUnavailable(
                "no checkpoint domains configured".to_string(),
            ));
        }

        let mut records = BTreeSet::new();
        let mut answered = 0usize;

        for domain in domains {
            match self.query(domain) {
                Ok(found) => {
                    answered += 1;
                    records.extend(found);
                }
                Err(e) => log::warn!("DNS checkpoint lookup for {} failed: {}", domain, e),
            }
        }

        if answered == 0 {
            return Err(CheckpointError::NetworkUnavailable(format!(
                "none of {} checkpoint domains answered",
                domains.len()
            )));
        }

        Ok(records.into_iter().collect())
    }
}

/// TXT data comes back as one or more quoted character-strings,
/// e.g. `"abc" "def"`; join them. Unquoted data is returned as is.
fn unquote_txt(data: &str) -> String {
    if !data.contains('"') {
        return data.to_string();
    }
    data.split('"').skip(1).step_by(2).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const HASH: &str = "b922e51c7cccba7f7fd12b395b942a6092566c47879862b127405dc16c3b415a";

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pinchain-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);
        assert_eq!(load_checkpoint_file(&path).unwrap(), None);
    }

    #[test]
    fn test_load_file_records() {
        let path = temp_path("records");
        let json = format!(
            r#"{{"hashlines":[{{"height":300000,"hash":"{}"}},{{"height":300100,"hash":"{}","difficulty":"999"}}]}}"#,
            HASH, HASH
        );
        fs::write(&path, json).unwrap();

        let records = load_checkpoint_file(&path).unwrap().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].height, 300000);
        assert_eq!(records[0].difficulty, None);
        assert_eq!(records[1].difficulty.as_deref(), Some("999"));
    }

    #[test]
    fn test_unparsable_file_is_source_unreadable() {
        let path = temp_path("garbage");
        fs::write(&path, "{ not json").unwrap();
        let result = load_checkpoint_file(&path);
        fs::remove_file(&path).unwrap();
        assert!(matches!(
            result,
            Err(CheckpointError::SourceUnreadable { .. })
        ));
    }

    #[test]
    fn test_parse_dns_record() {
        let (height, hash) = parse_dns_record(&format!("263664:{}", HASH)).unwrap();
        assert_eq!(height, 263664);
        assert_eq!(hash.to_string(), HASH);

        assert!(parse_dns_record(HASH).is_none());
        assert!(parse_dns_record(&format!("abc:{}", HASH)).is_none());
        assert!(parse_dns_record(&format!("-5:{}", HASH)).is_none());
        assert!(parse_dns_record("100:deadbeef").is_none());
        // only the first colon splits
        assert!(parse_dns_record(&format!("100:{}:extra", HASH)).is_none());
    }

    #[test]
    fn test_unquote_txt() {
        assert_eq!(unquote_txt("\"100:abc\""), "100:abc");
        assert_eq!(unquote_txt("\"100:ab\" \"cd\""), "100:abcd");
        assert_eq!(unquote_txt("100:abc"), "100:abc");
    }

    #[test]
    fn test_dns_urls_per_network() {
        assert!(dns_urls(NetworkType::Mainnet).is_empty());
        assert_eq!(dns_urls(NetworkType::Stagenet).len(), 4);
    }

    #[test]
    fn test_static_resolver_returns_records() {
        let resolver = StaticTxtResolver::new(["1:x", "2:y"]);
        assert_eq!(resolver.resolve_txt(&[]).unwrap(), vec!["1:x", "2:y"]);
    }
}
