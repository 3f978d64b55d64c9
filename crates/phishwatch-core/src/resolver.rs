//! SSRF-safe redirect resolution.
//!
//! Redirects are followed by hand so the destination policy in
//! [`crate::url_validate`] runs on every hop. Resolution never fails from the
//! caller's point of view: errors are folded into [`ResolveResult::error`].

use std::fmt;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use url::Url;

use crate::allowlist::MarketingAllowlist;
use crate::data;
use crate::url_info::{host_of_str, normalize_url};
use crate::url_validate::{self, BlockReason, HostTarget};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;
pub const DEFAULT_MAX_BODY_BYTES: u64 = 2 * 1024 * 1024;

const USER_AGENT: &str = "Mozilla/5.0 (PhishWatch Resolver)";

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Deadline for the whole resolution, DNS and every hop included.
    pub timeout: Duration,
    pub max_redirects: u32,
    pub max_body_bytes: u64,
    pub pool_max_idle_per_host: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            pool_max_idle_per_host: 8,
        }
    }
}

/// Why a resolution did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    UnsupportedScheme(String),
    InvalidUrl(String),
    /// Entry or post-redirect destination is internal. Deliberately carries no detail.
    BlockedHost,
    DnsFailure(String),
    Timeout,
    TooManyRedirects(u32),
    BodyTooLarge(u64),
    Transport(String),
    Busy,
}

impl ResolveError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolveError::UnsupportedScheme(_) => "unsupported_scheme",
            ResolveError::InvalidUrl(_) => "invalid_url",
            ResolveError::BlockedHost => "blocked_host",
            ResolveError::DnsFailure(_) => "dns_failure",
            ResolveError::Timeout => "timeout",
            ResolveError::TooManyRedirects(_) => "too_many_redirects",
            ResolveError::BodyTooLarge(_) => "body_too_large",
            ResolveError::Transport(_) => "transport",
            ResolveError::Busy => "busy",
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self.kind();
        match self {
            ResolveError::UnsupportedScheme(s) => write!(f, "{kind}: {s}"),
            ResolveError::InvalidUrl(msg) => write!(f, "{kind}: {msg}"),
            ResolveError::BlockedHost => write!(f, "{kind}: destination is not publicly routable"),
            ResolveError::DnsFailure(msg) => write!(f, "{kind}: {msg}"),
            ResolveError::Timeout => write!(f, "{kind}: resolution exceeded deadline"),
            ResolveError::TooManyRedirects(max) => write!(f, "{kind}: exceeded {max}"),
            ResolveError::BodyTooLarge(n) => write!(f, "{kind}: {n} bytes declared"),
            ResolveError::Transport(msg) => write!(f, "{kind}: {msg}"),
            ResolveError::Busy => write!(f, "{kind}: resolver capacity exhausted"),
        }
    }
}

impl std::error::Error for ResolveError {}

impl Serialize for ResolveError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of resolving one URL. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveResult {
    pub input_url: String,
    pub normalized_input_url: String,
    pub final_url: String,
    pub normalized_final_url: String,
    /// Normalized input first, then every distinct hop in visitation order.
    pub redirect_chain: Vec<String>,
    pub resolved: bool,
    pub input_is_shortener: bool,
    pub input_is_marketing: bool,
    pub final_is_marketing: bool,
    pub error: Option<ResolveError>,
}

impl ResolveResult {
    /// Degraded result: the input is treated as its own destination.
    pub fn failed(
        input_url: &str,
        allowlist: &MarketingAllowlist,
        error: ResolveError,
    ) -> Self {
        let normalized = normalize_url(input_url);
        let host = host_of_str(&normalized);
        let is_marketing = allowlist.matches(&host);
        Self {
            input_url: input_url.to_string(),
            normalized_input_url: normalized.clone(),
            final_url: normalized.clone(),
            normalized_final_url: normalized.clone(),
            redirect_chain: vec![normalized],
            resolved: false,
            input_is_shortener: data::is_url_shortener(&host),
            input_is_marketing: is_marketing,
            final_is_marketing: is_marketing,
            error: Some(error),
        }
    }
}

/// Status and headers of one hop. Bodies are never kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HopResponse {
    pub status: u16,
    pub location: Option<String>,
    pub content_length: Option<u64>,
}

impl HopResponse {
    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

/// Network access used by the resolver: DNS, HEAD and a capped GET.
/// Implementations must not follow redirects themselves.
pub trait Transport: Send + Sync {
    fn lookup(
        &self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Vec<IpAddr>, ResolveError>> + Send;

    fn head(&self, url: &Url) -> impl Future<Output = Result<HopResponse, ResolveError>> + Send;

    /// GET `url`, reading at most `max_body_bytes` of the body before dropping it.
    fn get(
        &self,
        url: &Url,
        max_body_bytes: u64,
    ) -> impl Future<Output = Result<HopResponse, ResolveError>> + Send;
}

/// DNS for the shared client. Connections only ever go to addresses that
/// passed the destination policy, so a second lookup cannot rebind the host.
#[derive(Debug, Clone, Copy, Default)]
struct VettedDns;

/// Connect-time lookup refused by the destination policy.
#[derive(Debug)]
struct RefusedAddress(BlockReason);

impl fmt::Display for RefusedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "destination refused: {}", self.0)
    }
}

impl std::error::Error for RefusedAddress {}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

async fn vetted_addrs(host: &str) -> Result<Vec<SocketAddr>, BoxError> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0)).await?.collect();
    let ips: Vec<IpAddr> = addrs.iter().map(SocketAddr::ip).collect();
    url_validate::check_addrs(&ips).map_err(RefusedAddress)?;
    Ok(addrs)
}

async fn resolve_vetted(host: String) -> Result<reqwest::dns::Addrs, BoxError> {
    if url_validate::is_blocked_hostname(&host) {
        return Err(Box::new(RefusedAddress(BlockReason::Hostname(host))));
    }
    let addrs = vetted_addrs(&host).await?;
    Ok(Box::new(addrs.into_iter()))
}

impl reqwest::dns::Resolve for VettedDns {
    fn resolve(&self, name: reqwest::dns::Name) -> reqwest::dns::Resolving {
        Box::pin(resolve_vetted(name.as_str().to_string()))
    }
}

/// Production transport: one pooled `reqwest::Client` with redirects disabled.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .dns_resolver(Arc::new(VettedDns))
            .no_proxy()
            .user_agent(USER_AGENT)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| ResolveError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ResolveError {
    let mut source = std::error::Error::source(&e);
    while let Some(err) = source {
        if let Some(refused) = err.downcast_ref::<RefusedAddress>() {
            tracing::debug!(reason = %refused.0, "connect-time address refused");
            return ResolveError::BlockedHost;
        }
        source = err.source();
    }
    if e.is_timeout() {
        ResolveError::Timeout
    } else {
        ResolveError::Transport(e.to_string())
    }
}

fn hop_from_response(resp: &reqwest::Response) -> HopResponse {
    let headers = resp.headers();
    HopResponse {
        status: resp.status().as_u16(),
        location: headers
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        content_length: headers
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok()),
    }
}

impl Transport for ReqwestTransport {
    async fn lookup(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, ResolveError> {
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ResolveError::DnsFailure(format!("{host}: {e}")))?;
        Ok(addrs.map(|a| a.ip()).collect())
    }

    async fn head(&self, url: &Url) -> Result<HopResponse, ResolveError> {
        let resp = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        Ok(hop_from_response(&resp))
    }

    async fn get(&self, url: &Url, max_body_bytes: u64) -> Result<HopResponse, ResolveError> {
        let mut resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let hop = hop_from_response(&resp);
        if hop.is_redirect() || hop.content_length.is_some_and(|n| n > max_body_bytes) {
            return Ok(hop);
        }

        let mut read: u64 = 0;
        while let Some(chunk) = resp.chunk().await.map_err(map_reqwest_error)? {
            read += chunk.len() as u64;
            if read >= max_body_bytes {
                break;
            }
        }
        Ok(hop)
    }
}

/// Follows redirects for a URL under the destination policy.
pub struct Resolver<T = ReqwestTransport> {
    transport: T,
    allowlist: Arc<MarketingAllowlist>,
    config: ResolverConfig,
}

impl Resolver<ReqwestTransport> {
    pub fn new(
        config: ResolverConfig,
        allowlist: Arc<MarketingAllowlist>,
    ) -> Result<Self, ResolveError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(transport, allowlist, config))
    }
}

impl<T: Transport> Resolver<T> {
    pub fn with_transport(
        transport: T,
        allowlist: Arc<MarketingAllowlist>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            transport,
            allowlist,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn allowlist(&self) -> &MarketingAllowlist {
        &self.allowlist
    }

    /// Resolve using the configured limits.
    pub async fn resolve(&self, raw_url: &str) -> ResolveResult {
        self.resolve_with(
            raw_url,
            self.config.timeout,
            self.config.max_redirects,
            self.config.max_body_bytes,
        )
        .await
    }

    pub async fn resolve_with(
        &self,
        raw_url: &str,
        timeout: Duration,
        max_redirects: u32,
        max_body_bytes: u64,
    ) -> ResolveResult {
        let normalized = normalize_url(raw_url);

        let followed = tokio::time::timeout(
            timeout,
            self.follow(&normalized, max_redirects, max_body_bytes),
        )
        .await
        .unwrap_or(Err(ResolveError::Timeout));

        let (chain, final_url) = match followed {
            Ok(followed) => followed,
            Err(e) => {
                tracing::debug!(url = %normalized, error = %e, "resolution failed");
                return ResolveResult::failed(raw_url, &self.allowlist, e);
            }
        };

        let input_host = host_of_str(&normalized);
        let normalized_final = normalize_url(&final_url);
        let final_host = host_of_str(&normalized_final);

        tracing::debug!(url = %normalized, final_url = %final_url, hops = chain.len(), "resolved");

        ResolveResult {
            input_url: raw_url.to_string(),
            normalized_input_url: normalized,
            final_url,
            normalized_final_url: normalized_final,
            redirect_chain: chain,
            resolved: true,
            input_is_shortener: data::is_url_shortener(&input_host),
            input_is_marketing: self.allowlist.matches(&input_host),
            final_is_marketing: self.allowlist.matches(&final_host),
            error: None,
        }
    }

    async fn follow(
        &self,
        start: &str,
        max_redirects: u32,
        max_body_bytes: u64,
    ) -> Result<(Vec<String>, String), ResolveError> {
        let mut current = parse_http_url(start)?;
        let mut chain = vec![start.to_string()];
        let mut visited = vec![current.clone()];
        let mut redirects = 0u32;

        self.guard(&current).await?;

        // Best effort: only a declared oversize body matters here.
        if let Ok(head) = self.transport.head(&current).await {
            check_declared_size(&head, max_body_bytes)?;
        }

        loop {
            let hop = self.transport.get(&current, max_body_bytes).await?;
            if !hop.is_redirect() {
                check_declared_size(&hop, max_body_bytes)?;
                break;
            }
            let Some(location) = hop.location.as_deref().map(str::trim).filter(|l| !l.is_empty())
            else {
                break;
            };

            redirects += 1;
            if redirects > max_redirects {
                return Err(ResolveError::TooManyRedirects(max_redirects));
            }

            let next = current
                .join(location)
                .map_err(|e| ResolveError::InvalidUrl(format!("redirect location: {e}")))?;
            require_http_scheme(&next)?;
            self.guard(&next).await?;

            if !visited.contains(&next) {
                chain.push(next.to_string());
                visited.push(next.clone());
            }
            current = next;
        }

        // The landing host is re-checked before the result is trusted.
        self.guard(&current).await?;

        // A bounce back to an earlier hop lands there; the chain stays deduplicated.
        let landed = visited
            .iter()
            .position(|u| *u == current)
            .and_then(|i| chain.get(i).cloned())
            .unwrap_or_else(|| current.to_string());
        Ok((chain, landed))
    }

    async fn guard(&self, url: &Url) -> Result<(), ResolveError> {
        let target = url_validate::host_target(url)
            .ok_or_else(|| ResolveError::InvalidUrl("missing host".to_string()))?;
        url_validate::check_host(target).map_err(|r| refuse(url, r))?;

        if let HostTarget::Domain(domain) = target {
            let port = url.port_or_known_default().unwrap_or(80);
            let addrs = self.transport.lookup(domain, port).await?;
            if addrs.is_empty() {
                return Err(ResolveError::DnsFailure(format!("{domain}: no addresses")));
            }
            url_validate::check_addrs(&addrs).map_err(|r| refuse(url, r))?;
        }
        Ok(())
    }
}

fn refuse(url: &Url, reason: BlockReason) -> ResolveError {
    tracing::debug!(host = url.host_str().unwrap_or(""), %reason, "destination refused");
    ResolveError::BlockedHost
}

fn require_http_scheme(url: &Url) -> Result<(), ResolveError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ResolveError::UnsupportedScheme(other.to_string())),
    }
}

fn parse_http_url(s: &str) -> Result<Url, ResolveError> {
    let url = Url::parse(s).map_err(|e| ResolveError::InvalidUrl(e.to_string()))?;
    require_http_scheme(&url)?;
    if url.host().is_none() {
        return Err(ResolveError::InvalidUrl("missing host".to_string()));
    }
    Ok(url)
}

fn check_declared_size(hop: &HopResponse, max_body_bytes: u64) -> Result<(), ResolveError> {
    match hop.content_length {
        Some(n) if n > max_body_bytes => Err(ResolveError::BodyTooLarge(n)),
        _ => Ok(()),
    }
}
