//! Prompt text for the general chat path.

use vitals_knowledge::ScoredResult;

pub const SYSTEM_PROMPT: &str = "你是一个专业的健康助手。请基于提供的参考信息来回答用户的问题。
如果参考信息不足以完整回答问题，可以补充其他相关的专业知识。

注意事项：
1. 优先使用参考信息中的内容
2. 确保回答准确专业
3. 使用通俗易懂的语言
4. 给出具体、可执行的建议
5. 不要提供医疗诊断或治疗建议";

/// Numbered reference blocks, one per retrieved snippet.
pub fn render_reference_context(results: &[ScoredResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| format!("参考信息 {}：{}", i + 1, result.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_chat_prompt(context: &str, message: &str) -> String {
    format!(
        "参考以下信息：\n\n{context}\n\n用户问题：{message}\n\n请根据以上参考信息和你的专业知识，给出合适的回答。"
    )
}
