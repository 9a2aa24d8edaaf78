mod common;

use std::sync::atomic::Ordering;

use blogpilot::content::{Generated, TopicStatus};
use blogpilot::parser::html::count_words;
use blogpilot::utils::GenerationError;
use chrono::{Datelike, Utc};
use common::{article_json, server_error, service, topic_of, DISCOVERY_PROMPT};

#[tokio::test]
async fn failing_model_falls_back_after_all_attempts() {
    let (content, calls) = service(|_| Err(server_error()));

    let generated = content.generate_blog_post("Kubernetes Cost Tips", 1500).await;

    assert!(generated.is_fallback());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    let post = generated.value();
    assert!(post.title.contains("Kubernetes Cost Tips"));
    assert!(post.content_html.contains("<article>"));
    assert_eq!(post.content_html.matches("<h1>").count(), 1);
    assert!(post.seo_report.word_count_actual > 0);
    assert_eq!(
        post.slug,
        format!("kubernetes-cost-tips-complete-{}-guide", Utc::now().year())
    );
}

#[tokio::test]
async fn fenced_topic_list_is_normalized() {
    let (content, _) = service(|prompt| {
        assert_eq!(prompt, DISCOVERY_PROMPT);
        Ok("Here you go:\n```json\n[{\"title\":\"X\"}]\n```".to_string())
    });

    let discovered = content.discover_topics().await;
    let Generated::Fresh(topics) = discovered else {
        panic!("expected fresh topics");
    };

    assert_eq!(topics.len(), 1);
    let topic = &topics[0];
    assert_eq!(topic.title, "X");
    assert!(topic.id.starts_with("topic-"));
    assert!((1..=100).contains(&topic.score));
    assert_eq!(topic.status, TopicStatus::Pending);
}

#[tokio::test]
async fn unusable_discovery_output_uses_fallback_topics() {
    let (content, calls) = service(|_| Ok("{\"topics\": \"none today\"}".to_string()));

    let discovered = content.discover_topics().await;

    assert!(discovered.is_fallback());
    assert_eq!(discovered.value().len(), 10);
    // 校验失败不重试
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_topic_list_is_a_failure() {
    let (content, _) = service(|_| Ok("[]".to_string()));
    assert!(content.discover_topics().await.is_fallback());
}

#[tokio::test]
async fn word_count_is_recomputed_from_html() {
    let (content, _) = service(|prompt| Ok(article_json(topic_of(prompt))));

    let generated = content.generate_blog_post("Async Rust", 1200).await;

    assert!(!generated.is_fallback());
    let post = generated.value();
    assert_eq!(post.seo_report.word_count_actual, count_words(&post.content_html));
    assert_ne!(post.seo_report.word_count_actual, 5000);
    assert_eq!(post.seo_report.score, 88);
    assert_eq!(post.slug, "async-rust");
    assert_eq!(post.tags, vec!["rust", "async"]);
    assert!(post.content_html.starts_with("<article>"));
}

#[tokio::test]
async fn rate_limit_is_retried_then_succeeds() {
    let (content, calls) = service({
        let seen = std::sync::atomic::AtomicUsize::new(0);
        move |prompt| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(GenerationError::Api {
                    status: 429,
                    message: r#"{"error":{"status":"RESOURCE_EXHAUSTED","details":[{"retryDelay":"0s"}]}}"#
                        .to_string(),
                })
            } else {
                Ok(article_json(topic_of(prompt)))
            }
        }
    });

    let generated = content.generate_blog_post("Edge Functions", 800).await;
    assert!(!generated.is_fallback());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn blank_title_goes_straight_to_template() {
    let (content, calls) = service(|_| Ok(article_json("unused")));

    let generated = content.generate_blog_post("   ", 1200).await;

    assert!(generated.is_fallback());
    assert!(generated.value().title.contains("Untitled Topic"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn topic_lifecycle_follows_generation_result() {
    let (content, _) = service(|prompt| {
        if topic_of(prompt) == "Broken" {
            Err(server_error())
        } else {
            Ok(article_json(topic_of(prompt)))
        }
    });
    let mut topics = blogpilot::content::fallback::fallback_topics();

    let mut good = topics.remove(0);
    good.title = "Working".to_string();
    let generated = content.generate_for_topic(&mut good, 1000).await.unwrap();
    assert!(!generated.is_fallback());
    assert_eq!(good.status, TopicStatus::Completed);
    assert_eq!(good.blog_post.as_ref().unwrap().topic_id, good.id);
    assert!(good.generated_at.is_some());

    let mut bad = topics.remove(0);
    bad.title = "Broken".to_string();
    let generated = content.generate_for_topic(&mut bad, 1000).await.unwrap();
    assert!(generated.is_fallback());
    assert_eq!(bad.status, TopicStatus::Failed);
    assert!(bad.blog_post.is_some());

    // 已完成的选题不能再次生成
    assert!(content.generate_for_topic(&mut good, 1000).await.is_err());
}
