//! Service category taxonomy and inference
//!
//! Categories form a closed set of tags. Inference runs in two passes on
//! service creation: first from the discovered tool names, then from the
//! service name against a keyword table of popular MCP server families.

use serde::{Deserialize, Serialize};

/// Closed set of service category tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceCategory {
    Search,
    Database,
    Storage,
    Ai,
    Browser,
    Communication,
    Productivity,
    DevTools,
    Finance,
    Media,
    Weather,
    Travel,
    Security,
    Custom,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 14] = [
        ServiceCategory::Search,
        ServiceCategory::Database,
        ServiceCategory::Storage,
        ServiceCategory::Ai,
        ServiceCategory::Browser,
        ServiceCategory::Communication,
        ServiceCategory::Productivity,
        ServiceCategory::DevTools,
        ServiceCategory::Finance,
        ServiceCategory::Media,
        ServiceCategory::Weather,
        ServiceCategory::Travel,
        ServiceCategory::Security,
        ServiceCategory::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Search => "search",
            ServiceCategory::Database => "database",
            ServiceCategory::Storage => "storage",
            ServiceCategory::Ai => "ai",
            ServiceCategory::Browser => "browser",
            ServiceCategory::Communication => "communication",
            ServiceCategory::Productivity => "productivity",
            ServiceCategory::DevTools => "dev-tools",
            ServiceCategory::Finance => "finance",
            ServiceCategory::Media => "media",
            ServiceCategory::Weather => "weather",
            ServiceCategory::Travel => "travel",
            ServiceCategory::Security => "security",
            ServiceCategory::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword fragments matched against tool names, checked in order
const TOOL_NAME_RULES: &[(&[&str], ServiceCategory)] = &[
    (&["search", "query", "find"], ServiceCategory::Search),
    (&["generate", "embed", "chat", "complete"], ServiceCategory::Ai),
    (&["read", "write", "file", "upload", "download"], ServiceCategory::Storage),
    (&["sql", "table", "row", "schema"], ServiceCategory::Database),
    (&["navigate", "click", "screenshot", "scrape"], ServiceCategory::Browser),
    (&["send", "message", "mail", "notify"], ServiceCategory::Communication),
];

/// Keyword fragments matched against service names. The table distils the
/// names of the popular MCP server families; first hit wins.
const SERVICE_NAME_RULES: &[(&[&str], ServiceCategory)] = &[
    (
        &["search", "exa", "brave", "tavily", "serp", "bing", "duckduckgo", "perplexity", "kagi"],
        ServiceCategory::Search,
    ),
    (
        &[
            "postgres", "mysql", "sqlite", "mongo", "redis", "clickhouse", "supabase", "neon",
            "duckdb", "snowflake", "bigquery", "db",
        ],
        ServiceCategory::Database,
    ),
    (
        &["filesystem", "file", "s3", "gcs", "drive", "dropbox", "box", "storage", "minio"],
        ServiceCategory::Storage,
    ),
    (
        &["openai", "anthropic", "gemini", "ollama", "huggingface", "replicate", "llm", "embedding"],
        ServiceCategory::Ai,
    ),
    (
        &["puppeteer", "playwright", "browser", "selenium", "chrome", "firecrawl", "crawl"],
        ServiceCategory::Browser,
    ),
    (
        &["slack", "discord", "telegram", "twilio", "email", "gmail", "smtp", "teams", "whatsapp"],
        ServiceCategory::Communication,
    ),
    (
        &["notion", "linear", "jira", "asana", "todoist", "trello", "calendar", "airtable", "obsidian"],
        ServiceCategory::Productivity,
    ),
    (
        &["github", "gitlab", "git", "docker", "kubernetes", "k8s", "terraform", "sentry", "ci"],
        ServiceCategory::DevTools,
    ),
    (
        &["stripe", "paypal", "coinbase", "binance", "stock", "crypto", "finance", "plaid"],
        ServiceCategory::Finance,
    ),
    (
        &["youtube", "spotify", "image", "video", "audio", "photo", "media", "ffmpeg"],
        ServiceCategory::Media,
    ),
    (&["weather", "forecast", "climate"], ServiceCategory::Weather),
    (
        &["flight", "hotel", "booking", "maps", "travel", "airbnb", "uber"],
        ServiceCategory::Travel,
    ),
    (
        &["shodan", "virustotal", "nmap", "vault", "security", "cve"],
        ServiceCategory::Security,
    ),
];

/// Infer a category from discovered tool names. Returns `None` when no
/// rule matches, letting the caller fall back to name-based inference.
pub fn infer_category_from_tools<'a, I>(tool_names: I) -> Option<ServiceCategory>
where
    I: IntoIterator<Item = &'a str>,
{
    let names: Vec<String> = tool_names.into_iter().map(|n| n.to_lowercase()).collect();
    for (keywords, category) in TOOL_NAME_RULES {
        if names
            .iter()
            .any(|name| keywords.iter().any(|kw| name.contains(kw)))
        {
            return Some(*category);
        }
    }
    None
}

/// Infer a category from a service name, falling back to `custom`
pub fn guess_category_from_name(name: &str) -> ServiceCategory {
    let name = name.to_lowercase();
    for (keywords, category) in SERVICE_NAME_RULES {
        if keywords.iter().any(|kw| name.contains(kw)) {
            return *category;
        }
    }
    ServiceCategory::Custom
}
