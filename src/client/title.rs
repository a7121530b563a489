//! Title derivation: best-effort remote request with a deterministic local
//! fallback.

use crate::backend::{BackendConfig, BackendKind};

/// 标题生成的系统提示词（与优化提示词一样以中文为准）。
pub(crate) const TITLE_PREAMBLE: &str = "你是一个标题生成专家。请根据用户提供的提示词内容，生成一个简短、准确、有描述性的标题。\n\
     要求：\n\
     1. 标题长度控制在10-20个字符\n\
     2. 标题要能概括提示词的主要用途或目的\n\
     3. 使用简洁的动词+名词结构\n\
     4. 不要使用引号或其他特殊符号\n\
     5. 只返回标题本身，不要有任何解释";

pub(crate) const TITLE_TEMPERATURE: f64 = 0.5;
pub(crate) const TITLE_MAX_TOKENS: u32 = 50;

/// Small model is enough for titles on the builtin backend; custom backends
/// use whatever model the user configured.
pub(crate) fn title_model(config: &BackendConfig) -> &str {
    match config.kind {
        BackendKind::Builtin => "gpt-4o-mini",
        BackendKind::Custom => &config.model,
    }
}

pub(crate) fn title_user_message(content: &str) -> String {
    format!("请为以下提示词生成标题：\n\n{content}")
}

/// Strip wrapping quotes and whitespace from a model-generated title.
pub(crate) fn clean_title(raw: &str) -> String {
    raw.trim().replace(['"', '\''], "")
}

/// Deterministic, pure local fallback when remote derivation fails.
///
/// Takes the first non-blank line, trimmed; if it exceeds 30 characters it is
/// truncated to 30 and an ellipsis marker is appended. Counts characters, not
/// bytes: content is frequently CJK. All-blank content gives an empty title.
pub fn fallback_title(content: &str) -> String {
    let trimmed = content
        .split('\n')
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    if trimmed.chars().count() <= 30 {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(30).collect();
    format!("{head}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_first_line_is_used_verbatim() {
        assert_eq!(fallback_title("请优化此方案\n详情..."), "请优化此方案");
    }

    #[test]
    fn first_line_is_trimmed() {
        assert_eq!(fallback_title("  hello world  \nrest"), "hello world");
    }

    #[test]
    fn long_first_line_is_truncated_by_characters_not_bytes() {
        let long = "优".repeat(40);
        let title = fallback_title(&long);
        assert_eq!(title.chars().count(), 33);
        assert!(title.ends_with("..."));
        assert!(title.starts_with(&"优".repeat(30)));
    }

    #[test]
    fn exactly_thirty_characters_is_not_truncated() {
        let line = "a".repeat(30);
        assert_eq!(fallback_title(&line), line);
    }

    #[test]
    fn leading_blank_lines_are_skipped() {
        assert_eq!(fallback_title("\n请优化此方案"), "请优化此方案");
        assert_eq!(fallback_title("  \n\n第一行\n第二行"), "第一行");
    }

    #[test]
    fn empty_content_gives_empty_title() {
        assert_eq!(fallback_title(""), "");
        assert_eq!(fallback_title("\n  \n"), "");
    }

    #[test]
    fn quotes_are_stripped_from_remote_titles() {
        assert_eq!(clean_title("  \"优化代码审查\"  "), "优化代码审查");
        assert_eq!(clean_title("'title'"), "title");
    }
}
