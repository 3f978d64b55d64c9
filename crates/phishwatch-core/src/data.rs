//! Static reference tables used by the heuristics and the resolver.

/// TLDs frequently abused in phishing and spam campaigns.
const SUSPICIOUS_TLDS: &[&str] = &[
    "xyz", "top", "click", "link", "info", "club", "online", "shop", "fit", "loan", "work", "gq",
    "cf", "tk",
];

/// Hosts of well-known link shortening services.
const URL_SHORTENER_DOMAINS: &[&str] = &[
    "bit.ly",
    "t.co",
    "tinyurl.com",
    "goo.gl",
    "ow.ly",
    "is.gd",
    "buff.ly",
    "cutt.ly",
    "rebrand.ly",
    "lnkd.in",
    "trib.al",
    "rb.gy",
    "shorturl.at",
];

/// Path fragments common on credential-harvesting pages. Checked in order, first match wins.
const CREDENTIAL_KEYWORDS: &[&str] = &[
    "login",
    "signin",
    "sign-in",
    "account",
    "verify",
    "verification",
    "reset",
    "password",
    "passwd",
    "secure",
    "webscr",
];

const URGENCY_KEYWORDS: &[&str] = &[
    "urgent",
    "suspended",
    "suspension",
    "immediately",
    "verify-now",
    "verifynow",
    "expire",
    "locked",
    "unusual-activity",
];

/// Query parameter names that should never appear in a link.
const SENSITIVE_QUERY_PARAMS: &[&str] = &[
    "password",
    "passwd",
    "pwd",
    "ssn",
    "cvv",
    "cardnumber",
    "card_number",
    "pin",
];

/// A brand and the registrable domains it legitimately serves from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Brand {
    /// Token an impersonator would put in a hostname.
    pub label: &'static str,
    /// Primary domain first.
    pub domains: &'static [&'static str],
}

impl Brand {
    pub fn primary_domain(&self) -> &'static str {
        self.domains.first().copied().unwrap_or(self.label)
    }

    /// True when `host` is one of the brand's domains or a subdomain of one.
    pub fn owns(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        self.domains.iter().any(|domain| {
            host == *domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }
}

const BRANDS: &[Brand] = &[
    Brand {
        label: "paypal",
        domains: &["paypal.com", "paypal.me", "paypalobjects.com"],
    },
    Brand {
        label: "apple",
        domains: &["apple.com", "apple.co", "icloud.com", "me.com"],
    },
    Brand {
        label: "icloud",
        domains: &["icloud.com", "apple.com"],
    },
    Brand {
        label: "microsoft",
        domains: &[
            "microsoft.com",
            "microsoftonline.com",
            "live.com",
            "office.com",
            "office365.com",
            "azure.com",
            "windows.net",
            "sharepoint.com",
        ],
    },
    Brand {
        label: "outlook",
        domains: &[
            "outlook.com",
            "office.com",
            "office365.com",
            "live.com",
            "microsoft.com",
        ],
    },
    Brand {
        label: "google",
        domains: &[
            "google.com",
            "google.co.uk",
            "google.de",
            "google.fr",
            "google.ca",
            "google.com.au",
            "googleusercontent.com",
            "gmail.com",
            "youtube.com",
            "appspot.com",
        ],
    },
    Brand {
        label: "amazon",
        domains: &[
            "amazon.com",
            "amazon.co.uk",
            "amazon.de",
            "amazon.fr",
            "amazon.it",
            "amazon.es",
            "amazon.ca",
            "amazon.co.jp",
            "amazon.in",
            "amazon.com.au",
            "amazonaws.com",
        ],
    },
    Brand {
        label: "netflix",
        domains: &["netflix.com", "netflix.net", "nflxvideo.net"],
    },
    Brand {
        label: "facebook",
        domains: &["facebook.com", "fb.com", "facebook.net", "fbcdn.net"],
    },
    Brand {
        label: "instagram",
        domains: &["instagram.com", "cdninstagram.com"],
    },
    Brand {
        label: "linkedin",
        domains: &["linkedin.com", "licdn.com", "lnkd.in"],
    },
    Brand {
        label: "dropbox",
        domains: &["dropbox.com", "dropboxusercontent.com"],
    },
    Brand {
        label: "docusign",
        domains: &["docusign.com", "docusign.net"],
    },
    Brand {
        label: "github",
        domains: &[
            "github.com",
            "github.io",
            "githubusercontent.com",
            "githubassets.com",
        ],
    },
    Brand {
        label: "chase",
        domains: &["chase.com", "jpmorganchase.com"],
    },
    Brand {
        label: "wellsfargo",
        domains: &["wellsfargo.com", "wf.com"],
    },
    Brand {
        label: "coinbase",
        domains: &["coinbase.com"],
    },
];

pub fn is_suspicious_tld(tld: &str) -> bool {
    let tld = tld.to_ascii_lowercase();
    SUSPICIOUS_TLDS.contains(&tld.as_str())
}

pub fn is_url_shortener(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    URL_SHORTENER_DOMAINS.contains(&host.as_str())
}

pub fn credential_keywords() -> &'static [&'static str] {
    CREDENTIAL_KEYWORDS
}

pub fn urgency_keywords() -> &'static [&'static str] {
    URGENCY_KEYWORDS
}

pub fn is_sensitive_query_param(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    SENSITIVE_QUERY_PARAMS.contains(&name.as_str())
}

pub fn brands() -> &'static [Brand] {
    BRANDS
}
