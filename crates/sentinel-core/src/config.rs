use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use alloy_primitives::Address;
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::error::{ConfigIssue, Result, SentinelError};

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_SETTLEMENT_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;
pub const DEFAULT_CONFIRMATIONS: u64 = 1;
/// USDC.
pub const DEFAULT_ASSET_DECIMALS: u8 = 6;

static PRIVATE_KEY_RE: OnceLock<Regex> = OnceLock::new();
static ADDRESS_RE: OnceLock<Regex> = OnceLock::new();

fn private_key_re() -> &'static Regex {
    PRIVATE_KEY_RE.get_or_init(|| Regex::new(r"^0x[a-fA-F0-9]{64}$").unwrap())
}

fn address_re() -> &'static Regex {
    ADDRESS_RE.get_or_init(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap())
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

/// The automation signing credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// RawConfig
// ---------------------------------------------------------------------------

/// Unvalidated settings as they arrive from flags or the environment.
#[derive(Debug, Clone, Default)]
pub struct RawConfig {
    pub rpc_url: Option<String>,
    pub private_key: Option<String>,
    pub vault_address: Option<String>,
    pub poll_interval_ms: Option<String>,
    pub port: Option<String>,
    pub read_timeout_ms: Option<String>,
    pub settlement_timeout_ms: Option<String>,
    pub receipt_poll_ms: Option<String>,
    pub confirmations: Option<String>,
    pub asset_decimals: Option<String>,
}

// ---------------------------------------------------------------------------
// LoopSettings
// ---------------------------------------------------------------------------

/// Timing knobs for the read/evaluate/execute loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopSettings {
    pub read_timeout: Duration,
    /// How long to wait for a sent transaction to settle.
    pub settlement_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub confirmations: u64,
    pub asset_decimals: u8,
}

impl LoopSettings {
    /// Hard ceiling on one execution attempt: dry-run and send are each bounded
    /// by the read timeout, then the settlement wait.
    pub fn submission_timeout(&self) -> Duration {
        self.read_timeout * 2 + self.settlement_timeout
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            settlement_timeout: Duration::from_millis(DEFAULT_SETTLEMENT_TIMEOUT_MS),
            receipt_poll_interval: Duration::from_millis(DEFAULT_RECEIPT_POLL_MS),
            confirmations: DEFAULT_CONFIRMATIONS,
            asset_decimals: DEFAULT_ASSET_DECIMALS,
        }
    }
}

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub rpc_url: Url,
    pub private_key: PrivateKey,
    pub vault_address: Address,
    pub poll_interval: Duration,
    pub port: u16,
    pub settings: LoopSettings,
}

impl AgentConfig {
    /// Validate every field, reporting all problems at once.
    pub fn from_raw(raw: &RawConfig) -> Result<Self> {
        let mut issues = Vec::new();

        let rpc_url = required(&mut issues, "RPC_URL", raw.rpc_url.as_deref())
            .and_then(|v| check(&mut issues, "RPC_URL", parse_rpc_url(v)));

        let private_key = required(&mut issues, "PRIVATE_KEY", raw.private_key.as_deref())
            .and_then(|v| {
                let ok = private_key_re().is_match(v);
                check(
                    &mut issues,
                    "PRIVATE_KEY",
                    ok.then(|| PrivateKey(v.to_string()))
                        .ok_or_else(|| "must be 0x followed by 64 hex characters".to_string()),
                )
            });

        let vault_address = required(&mut issues, "VAULT_ADDRESS", raw.vault_address.as_deref())
            .and_then(|v| check(&mut issues, "VAULT_ADDRESS", parse_address(v)));

        let poll_interval_ms = required(
            &mut issues,
            "POLL_INTERVAL_MS",
            raw.poll_interval_ms.as_deref(),
        )
        .and_then(|v| check(&mut issues, "POLL_INTERVAL_MS", parse_positive::<u64>(v)));

        let port = optional(
            &mut issues,
            "PORT",
            raw.port.as_deref(),
            DEFAULT_PORT,
            parse_positive::<u16>,
        );
        let read_timeout_ms = optional(
            &mut issues,
            "READ_TIMEOUT_MS",
            raw.read_timeout_ms.as_deref(),
            DEFAULT_READ_TIMEOUT_MS,
            parse_positive::<u64>,
        );
        let settlement_timeout_ms = optional(
            &mut issues,
            "SETTLEMENT_TIMEOUT_MS",
            raw.settlement_timeout_ms.as_deref(),
            DEFAULT_SETTLEMENT_TIMEOUT_MS,
            parse_positive::<u64>,
        );
        let receipt_poll_ms = optional(
            &mut issues,
            "RECEIPT_POLL_MS",
            raw.receipt_poll_ms.as_deref(),
            DEFAULT_RECEIPT_POLL_MS,
            parse_positive::<u64>,
        );
        let confirmations = optional(
            &mut issues,
            "CONFIRMATIONS",
            raw.confirmations.as_deref(),
            DEFAULT_CONFIRMATIONS,
            parse_positive::<u64>,
        );
        let asset_decimals = optional(
            &mut issues,
            "ASSET_DECIMALS",
            raw.asset_decimals.as_deref(),
            DEFAULT_ASSET_DECIMALS,
            parse_decimals,
        );

        if !issues.is_empty() {
            return Err(SentinelError::InvalidConfig(issues));
        }

        // Every `None` above pushed an issue, so these are all present.
        match (rpc_url, private_key, vault_address, poll_interval_ms) {
            (Some(rpc_url), Some(private_key), Some(vault_address), Some(poll_ms)) => Ok(Self {
                rpc_url,
                private_key,
                vault_address,
                poll_interval: Duration::from_millis(poll_ms),
                port,
                settings: LoopSettings {
                    read_timeout: Duration::from_millis(read_timeout_ms),
                    settlement_timeout: Duration::from_millis(settlement_timeout_ms),
                    receipt_poll_interval: Duration::from_millis(receipt_poll_ms),
                    confirmations,
                    asset_decimals,
                },
            }),
            _ => Err(SentinelError::InvalidConfig(vec![ConfigIssue {
                key: "config",
                message: "incomplete configuration".into(),
            }])),
        }
    }

    /// RPC endpoint with any userinfo stripped, safe to log.
    pub fn redacted_rpc_url(&self) -> String {
        let mut url = self.rpc_url.clone();
        let _ = url.set_username("");
        let _ = url.set_password(None);
        url.to_string()
    }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

fn required<'a>(
    issues: &mut Vec<ConfigIssue>,
    key: &'static str,
    value: Option<&'a str>,
) -> Option<&'a str> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Some(v),
        None => {
            issues.push(ConfigIssue {
                key,
                message: "is required".into(),
            });
            None
        }
    }
}

fn optional<T>(
    issues: &mut Vec<ConfigIssue>,
    key: &'static str,
    value: Option<&str>,
    default: T,
    parse: fn(&str) -> std::result::Result<T, String>,
) -> T {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => default,
        Some(v) => check(issues, key, parse(v)).unwrap_or(default),
    }
}

fn check<T>(
    issues: &mut Vec<ConfigIssue>,
    key: &'static str,
    parsed: std::result::Result<T, String>,
) -> Option<T> {
    match parsed {
        Ok(v) => Some(v),
        Err(message) => {
            issues.push(ConfigIssue { key, message });
            None
        }
    }
}

fn parse_rpc_url(v: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(v).map_err(|e| format!("invalid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}', expected http or https")),
    }
}

fn parse_address(v: &str) -> std::result::Result<Address, String> {
    if !address_re().is_match(v) {
        return Err("must be 0x followed by 40 hex characters".into());
    }
    Address::from_str(v).map_err(|e| format!("invalid address: {e}"))
}

fn parse_positive<T>(v: &str) -> std::result::Result<T, String>
where
    T: FromStr + PartialOrd + Default,
{
    match v.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err("must be a positive integer".into()),
    }
}

fn parse_decimals(v: &str) -> std::result::Result<u8, String> {
    match v.parse::<u8>() {
        Ok(n) if n <= 77 => Ok(n),
        _ => Err("must be an integer between 0 and 77".into()),
    }
}
