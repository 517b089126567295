//! Locale negotiation and the minimal message set
//!
//! The gateway serves three locales; the default is Chinese. Catalog
//! entries use `{0}`, `{1}`, … placeholders filled from the error's
//! template arguments. Keys missing from the catalog fall back to the
//! error's developer message.

/// Supported locales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    ZhCn,
    EnUs,
    JaJp,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::ZhCn => "zh-CN",
            Locale::EnUs => "en-US",
            Locale::JaJp => "ja-JP",
        }
    }
}

/// Resolve an `Accept-Language` header value, first match wins
pub fn negotiate(accept_language: Option<&str>) -> Locale {
    let Some(header) = accept_language else {
        return Locale::ZhCn;
    };
    for part in header.split(',') {
        let tag = part.split(';').next().unwrap_or("").trim().to_lowercase();
        if tag.starts_with("zh") {
            return Locale::ZhCn;
        }
        if tag.starts_with("en") {
            return Locale::EnUs;
        }
        if tag.starts_with("ja") {
            return Locale::JaJp;
        }
    }
    Locale::ZhCn
}

/// Render a catalog message, or fall back to the given default
pub fn message(locale: Locale, key: &str, args: &[String], fallback: &str) -> String {
    let template = match lookup(locale, key) {
        Some(template) => template,
        None => return fallback.to_string(),
    };
    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        out = out.replace(&format!("{{{}}}", i), arg);
    }
    out
}

fn lookup(locale: Locale, key: &str) -> Option<&'static str> {
    let row = CATALOG.iter().find(|(k, ..)| *k == key)?;
    Some(match locale {
        Locale::ZhCn => row.1,
        Locale::EnUs => row.2,
        Locale::JaJp => row.3,
    })
}

/// key, zh-CN, en-US, ja-JP
const CATALOG: &[(&str, &str, &str, &str)] = &[
    (
        "auth.invalid_token",
        "访问令牌无效",
        "Invalid access token",
        "アクセストークンが無効です",
    ),
    (
        "auth.feature_disabled",
        "该功能未启用",
        "This feature is disabled",
        "この機能は無効になっています",
    ),
    (
        "service.not_found",
        "服务 {0} 不存在",
        "Service {0} not found",
        "サービス {0} が見つかりません",
    ),
    (
        "group.not_found",
        "分组 '{0}' 不存在",
        "Group '{0}' not found",
        "グループ '{0}' が見つかりません",
    ),
    (
        "tool.not_found",
        "工具 '{0}' 不存在",
        "Tool '{0}' not found",
        "ツール '{0}' が見つかりません",
    ),
    (
        "common.not_found",
        "{0} 不存在",
        "{0} not found",
        "{0} が見つかりません",
    ),
    (
        "common.invalid_input",
        "请求参数无效",
        "Invalid request input",
        "リクエスト入力が無効です",
    ),
    (
        "common.conflict",
        "操作与现有数据冲突",
        "The operation conflicts with existing data",
        "操作が既存のデータと競合しています",
    ),
    (
        "common.timeout",
        "操作超时",
        "Operation timed out",
        "操作がタイムアウトしました",
    ),
    (
        "common.internal_error",
        "内部服务器错误",
        "Internal server error",
        "内部サーバーエラー",
    ),
    (
        "backend.transport_error",
        "连接后端服务失败",
        "Failed to reach the backend service",
        "バックエンドサービスへの接続に失敗しました",
    ),
    (
        "backend.protocol_error",
        "后端协议错误",
        "Backend protocol error",
        "バックエンドプロトコルエラー",
    ),
    (
        "backend.mcp_error",
        "MCP 后端错误",
        "MCP backend error",
        "MCP バックエンドエラー",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation() {
        assert_eq!(negotiate(None), Locale::ZhCn);
        assert_eq!(negotiate(Some("en-US,en;q=0.9")), Locale::EnUs);
        assert_eq!(negotiate(Some("ja")), Locale::JaJp);
        assert_eq!(negotiate(Some("fr-FR")), Locale::ZhCn);
        assert_eq!(negotiate(Some("fr-FR, en;q=0.5")), Locale::EnUs);
    }

    #[test]
    fn test_message_templating() {
        let rendered = message(
            Locale::EnUs,
            "group.not_found",
            &["prod".to_string()],
            "fallback",
        );
        assert_eq!(rendered, "Group 'prod' not found");

        let rendered = message(Locale::ZhCn, "group.not_found", &["prod".to_string()], "x");
        assert!(rendered.contains("prod"));

        // Unknown key falls back to the developer message
        assert_eq!(message(Locale::EnUs, "no.such.key", &[], "dev text"), "dev text");
    }
}
