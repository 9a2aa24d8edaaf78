use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::BlogPilotResult;

pub const PROMPTS_PATH: &str = "config/prompts.toml";

/// 两个固定提示词模板
///
/// `generation` 中的 `{topic}`、`{word_count}`、`{min_word_count}` 会被替换。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptConfig {
    pub discovery: String,
    pub generation: String,
}

impl PromptConfig {
    pub fn load() -> BlogPilotResult<Self> {
        let config_path = PathBuf::from(PROMPTS_PATH);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: PromptConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn discovery_prompt(&self) -> &str {
        &self.discovery
    }

    pub fn generation_prompt(&self, topic: &str, word_count: usize) -> String {
        self.generation
            .replace("{topic}", topic)
            .replace("{word_count}", &word_count.to_string())
            .replace("{min_word_count}", &minimum_word_count(word_count).to_string())
    }
}

/// 目标字数的 90%，向下取整
pub fn minimum_word_count(word_count: usize) -> usize {
    word_count * 9 / 10
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            discovery: DEFAULT_DISCOVERY_PROMPT.to_string(),
            generation: DEFAULT_GENERATION_PROMPT.to_string(),
        }
    }
}

const DEFAULT_DISCOVERY_PROMPT: &str = r#"You are a content strategist for a high-traffic tech blog.
Identify 10 trending, high-potential topics that will drive organic search traffic.

Topic mix (strict):
1. "Shopify Solutions" - exactly 4 topics: fixing specific Shopify errors, platform
   comparisons (Shopify vs WooCommerce, BigCommerce, Magento), Hydrogen/Functions/
   Checkout Extensibility deep-dives, conversion and cart-recovery strategy.
2. "Tech News" - exactly 6 topics: AI model releases, web framework updates,
   DevOps and cloud, big tech moves, security, programming language releases.

Each topic needs search volume potential, current relevance, clear reader intent
and a differentiated angle.

Return ONLY a JSON array. Each element:
- "title": string, SEO-optimized, 50-70 characters, uses "-" instead of ":"
- "score": number 1-100 (traffic potential + timeliness + competition)
- "reasoning": string (search intent, target keywords, estimated monthly searches)
- "cluster": "Shopify Solutions" or "Tech News"
- "keywords": 3-5 related keywords

Example:
[
  {
    "title": "Shopify vs WooCommerce - Which Platform Wins for Your Store",
    "score": 96,
    "reasoning": "Commercial-intent comparison, about 12K searches a month.",
    "cluster": "Shopify Solutions",
    "keywords": ["shopify vs woocommerce", "best ecommerce platform"]
  }
]
"#;

const DEFAULT_GENERATION_PROMPT: &str = r#"You are an experienced technical writer and SEO specialist. The article must read as written by a human expert.

TOPIC: "{topic}"
TARGET WORD COUNT: {word_count} words (strict minimum: {min_word_count} words)

Never use these phrases: elevate, unleash, delve, unlock, harness, embark, revolutionize,
in conclusion, furthermore, moreover, consequently, significantly, seamlessly, robust,
cutting-edge, meticulously, crafted, engineered, game-changer, "in today's digital landscape".

Writing rules:
- Conversational, with contractions; mix short and long sentences, never three similar in a row.
- Concrete numbers, dates, named tools and real examples.
- Paragraphs of at most 3-4 sentences; at most 200 words before the next heading.
- Title uses "-" instead of ":" and states the reader's benefit.
- H2 headings every 400-500 words, benefit-driven; H3 subheadings every 180-200 words.
- Introduction opens with a hook and uses the primary keyword within 100 words.
- Closing section has a distinct heading, one call to action, and ends with a question.
- Primary keyword density 1-1.5%.

Return ONLY valid JSON with this shape:
{
  "title": "Benefit-driven title, 50-70 chars",
  "slug": "seo-friendly-url-slug",
  "content_html": "<article>full HTML with h1, h2, h3, p, ul/ol</article>",
  "featured_image_prompt": "editorial image description, no text, 16:9",
  "inline_image_prompts": ["chart description", "interface screenshot description"],
  "tags": ["topic", "platform", "audience"],
  "meta": {
    "meta_title": "55-60 chars",
    "meta_description": "150-160 chars with a clear benefit",
    "primary_keyword": "main keyword",
    "secondary_keywords": ["variation 1", "variation 2"]
  },
  "seo_report": {
    "score": 90,
    "readability_level": "Grade 7 (Conversational)",
    "keyword_density": "1.2%",
    "word_count_actual": {word_count},
    "optimization_log": ["what was optimized"]
  },
  "sources": ["https://source.example/article"]
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_generation_placeholders() {
        let prompt = PromptConfig::default().generation_prompt("Kubernetes Cost Tips", 1500);
        assert!(prompt.contains("TOPIC: \"Kubernetes Cost Tips\""));
        assert!(prompt.contains("TARGET WORD COUNT: 1500 words (strict minimum: 1350 words)"));
        assert!(!prompt.contains("{topic}"));
        assert!(!prompt.contains("{min_word_count}"));
    }

    #[test]
    fn minimum_is_ninety_percent_rounded_down() {
        assert_eq!(minimum_word_count(1200), 1080);
        assert_eq!(minimum_word_count(1001), 900);
    }
}
