use std::sync::LazyLock;

use regex::Regex;

/// 标签名最大字符数
pub const MAX_TAG_CHARS: usize = 50;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("invalid html tag regex"));

/// 字符引用，如 `&#39;`、`&#x27;`、`&nbsp;`
static HTML_ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z][A-Za-z0-9]*);")
        .expect("invalid html entity regex")
});

static HASHTAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#([\p{Han}A-Za-z0-9_]{1,50})").expect("invalid hashtag regex")
});

/// 标签之后不允许紧跟的字符
static TAG_BOUNDARY_VIOLATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[#\p{Han}A-Za-z0-9_]").expect("invalid boundary regex"));

/// 去除 HTML 标签和字符引用，只保留文本
///
/// 两者都替换为空格，避免 `<p>#a</p><p>b</p>` 中相邻文本被拼接，
/// 也避免 `&#39;` 里的数字被当成标签。
pub fn strip_html(html: &str) -> String {
    let text = HTML_TAG.replace_all(html, " ");
    HTML_ENTITY.replace_all(&text, " ").into_owned()
}

/// 从 HTML 内容中提取话题标签
///
/// - 先去除 HTML 标签和字符引用，属性值和实体中的 `#` 不会被匹配
/// - 标签由 1~50 个汉字、ASCII 字母数字或下划线组成
/// - 紧跟 `#` 或标签字符的匹配被丢弃，因此 `#a#b` 只得到 `b`
/// - 统一转为小写并去重，保留首次出现的顺序
pub fn extract_hashtags(html: &str) -> Vec<String> {
    let text = strip_html(html);
    let mut tags: Vec<String> = Vec::new();

    for caps in HASHTAG.captures_iter(&text) {
        let Some(whole) = caps.get(0) else { continue };
        if TAG_BOUNDARY_VIOLATION.is_match(&text[whole.end()..]) {
            continue;
        }

        let name = caps[1].to_lowercase();
        if !tags.contains(&name) {
            tags.push(name);
        }
    }

    tags
}
