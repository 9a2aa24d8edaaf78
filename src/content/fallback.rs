//! 生成失败时的本地确定性内容

use chrono::{DateTime, Datelike, Utc};

use super::defaults::ARTICLE_DEFAULTS;
use super::models::{BlogPost, Cluster, Topic, TopicStatus};
use super::normalize::{build_article, new_topic_id, RawArticle, RawMeta, RawSeoReport};
use super::text::{extract_primary_keyword, truncate_chars};
use crate::parser::html::escape_html;

/// 固定的兜底文章：引言、三个 H2 小节、编号策略列表、结尾行动号召
pub fn fallback_article(topic_title: &str, now: DateTime<Utc>) -> BlogPost {
    let year = now.year();
    let topic = escape_html(topic_title);
    let title = format!("{} - Complete {} Guide", topic_title, year);
    let primary_keyword = extract_primary_keyword(topic_title);

    let content_html = format!(
        r#"<article>
<h1>{topic} - Complete {year} Guide</h1>

<p>Looking to get {topic} right? You're in the right place. This guide breaks down what you need to know.</p>

<p>We'll cover practical strategies that work. No fluff. Just steps you can start using today.</p>

<h2>Why {topic} Matters Right Now</h2>

<p>The landscape has changed. What worked last year doesn't cut it anymore.</p>

<p>Here's what's different in {year}. The competition has leveled up, your customers expect more, and the tools have gotten better.</p>

<h2>What You Need to Know About {topic}</h2>

<p>Start with the basics. {topic} isn't as complicated as it seems once you split it into three parts:</p>

<ul>
<li>Understanding the core concepts</li>
<li>Choosing the right tools</li>
<li>Putting proven strategies into practice</li>
</ul>

<h2>Proven Strategies That Work</h2>

<ol>
<li><strong>Start small.</strong> Don't try to do everything at once. Pick one area and nail it.</li>
<li><strong>Measure results.</strong> You can't improve what you don't measure. Track your key metrics weekly.</li>
<li><strong>Iterate quickly.</strong> Test, learn, adjust. Speed beats perfection.</li>
</ol>

<p><strong>Your next step:</strong> pick one thing from this guide and start on it today. Not tomorrow. Today. What's the first thing you're going to try?</p>
</article>"#
    );

    let raw = RawArticle {
        title: Some(title.clone()),
        slug: None,
        content_html: Some(content_html),
        featured_image_prompt: Some(format!(
            "Professional editorial image for {}, modern tech aesthetic, clean composition, natural office lighting, no text on image, 16:9 ratio",
            topic_title
        )),
        inline_image_prompts: vec![
            format!("Clean diagram illustrating key concepts of {}, minimalist design", topic_title),
            format!("Modern dashboard showing {} in action, realistic screenshot style", topic_title),
        ],
        tags: vec![
            primary_keyword.clone(),
            "guide".to_string(),
            "tips".to_string(),
            year.to_string(),
            "strategies".to_string(),
        ],
        meta: Some(RawMeta {
            meta_title: Some(format!("{} - Guide & Tips for {}", topic_title, year)),
            meta_description: Some(format!(
                "Master {} with our complete guide. Get actionable tips and strategies that work in {}.",
                topic_title, year
            )),
            primary_keyword: Some(primary_keyword),
            secondary_keywords: vec![
                topic_title.to_string(),
                "guide".to_string(),
                "tips".to_string(),
                year.to_string(),
                "strategies".to_string(),
            ],
        }),
        seo_report: Some(RawSeoReport {
            score: Some(82.into()),
            readability_level: Some("Grade 7".to_string()),
            keyword_density: Some("1.3%".into()),
            optimization_log: vec!["Fallback generation used - professional template applied".to_string()],
        }),
        sources: Vec::new(),
    };

    let mut post = build_article(raw, topic_title, now);
    post.meta.meta_title = truncate_chars(&post.meta.meta_title, ARTICLE_DEFAULTS.meta_title_max_chars);
    post
}

/// 发现失败时返回的固定选题
pub fn fallback_topics() -> Vec<Topic> {
    const TOPICS: &[(&str, u8, &str, Cluster, &[&str])] = &[
        (
            "Shopify vs WooCommerce 2026 - Which Platform Wins for Your Store",
            94,
            "High commercial intent, comparison keyword, 8K monthly searches",
            Cluster::ShopifySolutions,
            &["shopify vs woocommerce", "ecommerce platform comparison", "best store platform 2026"],
        ),
        (
            "Fix Shopify Checkout Errors - 7 Common Issues Solved",
            91,
            "Problem-solving content, high conversion value, 5K monthly searches",
            Cluster::ShopifySolutions,
            &["shopify checkout error", "fix shopify checkout", "shopify payment issues"],
        ),
        (
            "Shopify Hydrogen Tutorial - Build Headless Stores in 2026",
            88,
            "Technical guide, growing developer interest, 3K monthly searches",
            Cluster::ShopifySolutions,
            &["shopify hydrogen", "headless shopify", "shopify react"],
        ),
        (
            "Abandoned Cart Recovery on Shopify - Win Back 15% of Lost Sales",
            86,
            "Revenue-focused strategy content, evergreen, 4K monthly searches",
            Cluster::ShopifySolutions,
            &["abandoned cart recovery", "shopify cart emails", "recover lost sales"],
        ),
        (
            "Claude AI vs ChatGPT 2026 - Developer Performance Comparison",
            96,
            "Breaking tech news, high search volume, 15K monthly searches",
            Cluster::TechNews,
            &["claude vs chatgpt", "best ai for coding", "ai comparison 2026"],
        ),
        (
            "React 19 Migration Guide - Update Your App in 3 Hours",
            93,
            "Framework update, developer audience, 12K monthly searches",
            Cluster::TechNews,
            &["react 19", "react migration", "update react app"],
        ),
        (
            "Next.js 15 App Router - Complete Tutorial With Examples",
            92,
            "Hot framework topic, tutorial content, 10K monthly searches",
            Cluster::TechNews,
            &["nextjs 15", "app router tutorial", "nextjs guide"],
        ),
        (
            "Docker Security Best Practices - Protect Your Containers in 2026",
            87,
            "Security content, evergreen topic, 6K monthly searches",
            Cluster::TechNews,
            &["docker security", "container security", "secure docker"],
        ),
        (
            "Kubernetes Cost Optimization - Cut Cloud Bills by 40%",
            90,
            "Cost-saving angle, business value, 8K monthly searches",
            Cluster::TechNews,
            &["kubernetes cost", "k8s optimization", "reduce cloud costs"],
        ),
        (
            "AI Code Review Tools - Top 5 That Actually Work in 2026",
            95,
            "Tool comparison, AI trend, high intent, 11K monthly searches",
            Cluster::TechNews,
            &["ai code review", "automated code review", "best code review tools"],
        ),
    ];

    TOPICS
        .iter()
        .map(|(title, score, reasoning, cluster, keywords)| Topic {
            id: new_topic_id(),
            title: title.to_string(),
            score: *score,
            reasoning: reasoning.to_string(),
            cluster: *cluster,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            status: TopicStatus::Pending,
            blog_post: None,
            generated_at: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::defaults::MAX_TOPICS;
    use crate::parser::html::count_words;

    #[test]
    fn fallback_article_has_required_structure() {
        let now = Utc::now();
        let post = fallback_article("Kubernetes Cost Tips", now);

        assert!(post.title.contains("Kubernetes Cost Tips"));
        assert!(post.content_html.starts_with("<article>"));
        assert_eq!(post.content_html.matches("<h1>").count(), 1);
        assert_eq!(post.content_html.matches("<h2>").count(), 3);
        assert!(post.content_html.contains("<ol>"));
        assert_eq!(post.slug, format!("kubernetes-cost-tips-complete-{}-guide", now.year()));
        assert_eq!(post.meta.primary_keyword, "kubernetes cost tips");
        assert_eq!(post.seo_report.word_count_actual, count_words(&post.content_html));
        assert!(post.seo_report.word_count_actual > 0);
        assert!(post.meta.meta_title.chars().count() <= 60);
        assert!(!post.sources.is_empty());
    }

    #[test]
    fn fallback_article_escapes_title_in_html() {
        let post = fallback_article("<script>alert(1)</script>", Utc::now());
        assert!(!post.content_html.contains("<script>"));
        assert!(post.content_html.contains("&lt;script&gt;"));
    }

    #[test]
    fn fallback_topics_are_complete_and_unique() {
        let topics = fallback_topics();
        assert_eq!(topics.len(), MAX_TOPICS);
        let shopify = topics.iter().filter(|t| t.cluster == Cluster::ShopifySolutions).count();
        assert_eq!(shopify, 4);
        let mut ids: Vec<_> = topics.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), topics.len());
        assert!(topics.iter().all(|t| t.status == TopicStatus::Pending && (1..=100).contains(&t.score)));
    }
}
