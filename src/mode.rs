//! Optimize modes and their system-prompt preambles.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named transformation style. Each mode owns a default instruction
/// preamble; the embedding app may override it per mode through settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizeMode {
    Concise,
    Detailed,
    Professional,
}

impl OptimizeMode {
    pub const ALL: [OptimizeMode; 3] = [
        OptimizeMode::Concise,
        OptimizeMode::Detailed,
        OptimizeMode::Professional,
    ];

    /// 默认系统提示词（中文为产品的原生语言）。
    pub fn default_preamble(self) -> &'static str {
        match self {
            OptimizeMode::Concise => {
                "你是一个提示词优化专家。请将用户的输入优化为简洁、精准的提示词。\n\
                 要求：\n\
                 1. 保留核心意图\n\
                 2. 去除冗余表达\n\
                 3. 使用精准动词\n\
                 4. 字数控制在50字以内"
            }
            OptimizeMode::Detailed => {
                "你是一个提示词优化专家。请将用户的输入优化为详细、完整的提示词。\n\
                 要求：\n\
                 1. 补充背景信息和上下文\n\
                 2. 明确输出格式要求\n\
                 3. 添加必要的约束条件\n\
                 4. 指定语气和风格"
            }
            OptimizeMode::Professional => {
                "你是一个提示词优化专家。请将用户的输入优化为专业、结构化的提示词。\n\
                 要求：\n\
                 1. 包含角色设定\n\
                 2. 明确任务目标\n\
                 3. 提供思考步骤\n\
                 4. 指定输出格式\n\
                 5. 给出示例（如适用）"
            }
        }
    }

    /// Resolve the effective preamble: a non-empty custom override wins,
    /// otherwise the built-in default. Never returns an empty string.
    pub fn effective_preamble<'a>(self, overrides: &'a HashMap<OptimizeMode, String>) -> &'a str {
        match overrides.get(&self) {
            Some(custom) if !custom.trim().is_empty() => custom.as_str(),
            _ => self.default_preamble(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_has_a_nonempty_default() {
        for mode in OptimizeMode::ALL {
            assert!(!mode.default_preamble().trim().is_empty());
        }
    }

    #[test]
    fn custom_override_wins() {
        let mut overrides = HashMap::new();
        overrides.insert(OptimizeMode::Concise, "自定义提示词".to_string());
        assert_eq!(
            OptimizeMode::Concise.effective_preamble(&overrides),
            "自定义提示词"
        );
        // Other modes are unaffected.
        assert_eq!(
            OptimizeMode::Detailed.effective_preamble(&overrides),
            OptimizeMode::Detailed.default_preamble()
        );
    }

    #[test]
    fn blank_override_falls_back_to_default() {
        let mut overrides = HashMap::new();
        overrides.insert(OptimizeMode::Professional, "   ".to_string());
        assert_eq!(
            OptimizeMode::Professional.effective_preamble(&overrides),
            OptimizeMode::Professional.default_preamble()
        );
    }
}
