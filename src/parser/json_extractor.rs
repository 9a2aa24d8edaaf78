use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::utils::GenerationError;

fn fence_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?i)```json\n?").unwrap(),
            Regex::new(r"```\n?").unwrap(),
        ]
    })
}

/// 从模型原始输出中截取最可能是 JSON 的片段
///
/// 先去掉代码围栏，再以第一个 `{` / `[` 中较早者作为起点，
/// 以对应闭合字符的**最后一次**出现作为终点。
/// 这是启发式截取而非解析：如果 JSON 之后的说明文字里还有同类括号，
/// 终点会越界，随后的解析会失败（调用方走降级路径）。
/// 找不到起点时原样返回清理后的文本。
pub fn extract_json(text: &str) -> String {
    let [json_fence, bare_fence] = fence_patterns();
    let without_json_fence = json_fence.replace_all(text, "");
    let cleaned = bare_fence.replace_all(&without_json_fence, "");
    let cleaned = cleaned.trim();

    let object_start = cleaned.find('{');
    let array_start = cleaned.find('[');

    let bounds = match (object_start, array_start) {
        (Some(obj), Some(arr)) if obj < arr => Some((obj, cleaned.rfind('}'))),
        (Some(obj), None) => Some((obj, cleaned.rfind('}'))),
        (_, Some(arr)) => Some((arr, cleaned.rfind(']'))),
        (None, None) => None,
    };

    match bounds {
        Some((start, Some(end))) if end >= start => cleaned[start..=end].to_string(),
        _ => cleaned.to_string(),
    }
}

/// 截取并解析，失败直接返回错误
pub fn parse_json(text: &str) -> Result<Value, GenerationError> {
    let candidate = extract_json(text);
    Ok(serde_json::from_str(&candidate)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_json_code_fence() {
        let raw = "```json\n[{\"title\":\"X\"}]\n```";
        assert_eq!(extract_json(raw), r#"[{"title":"X"}]"#);
        assert_eq!(parse_json(raw).unwrap(), json!([{"title": "X"}]));
    }

    #[test]
    fn strips_uppercase_and_bare_fences() {
        let raw = "```JSON\n{\"a\": 1}\n```";
        assert_eq!(parse_json(raw).unwrap(), json!({"a": 1}));

        let raw = "```\n{\"a\": 2}\n```";
        assert_eq!(parse_json(raw).unwrap(), json!({"a": 2}));
    }

    #[test]
    fn skips_leading_prose() {
        let raw = "Sure! Here are your topics:\n[{\"title\": \"A\"}, {\"title\": \"B\"}]";
        assert_eq!(parse_json(raw).unwrap(), json!([{"title": "A"}, {"title": "B"}]));
    }

    #[test]
    fn earlier_delimiter_decides_shape() {
        let raw = r#"{"title": "T", "tags": ["a", "b"]}"#;
        assert!(parse_json(raw).unwrap().is_object());

        let raw = r#"[{"title": "T"}]"#;
        assert!(parse_json(raw).unwrap().is_array());
    }

    #[test]
    fn trailing_prose_without_braces_is_ignored() {
        let raw = "{\"title\": \"T\"}\n\nLet me know if you need changes.";
        assert_eq!(parse_json(raw).unwrap(), json!({"title": "T"}));
    }

    #[test]
    fn trailing_braces_after_payload_mis_slice() {
        // 已知限制：终点取最后一个 `}`，尾随文字中的括号会被并入
        let raw = "{\"title\": \"T\"}\nNote: {placeholder} fields were omitted.";
        assert_eq!(extract_json(raw), "{\"title\": \"T\"}\nNote: {placeholder}");
        assert!(parse_json(raw).is_err());
    }

    #[test]
    fn no_delimiters_returns_cleaned_text() {
        assert_eq!(extract_json("```json\nnot json at all\n```"), "not json at all");
        assert!(matches!(parse_json("not json at all"), Err(GenerationError::Parse(_))));
    }

    #[test]
    fn closing_before_opening_returns_cleaned_text() {
        assert_eq!(extract_json("] oops ["), "] oops [");
    }
}
