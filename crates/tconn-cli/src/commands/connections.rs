use anyhow::{Context, Result};

use super::{connect_service, load_settings, parse_window};

pub struct TopicArgs<'a> {
    pub cluster_id: i64,
    pub topic_name: &'a str,
    pub app_id: Option<&'a str>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub config_paths: &'a [String],
}

/// Print the reconciled connections of one topic as JSON.
pub async fn run_topic(args: TopicArgs<'_>) -> Result<()> {
    let (start, end) = parse_window(args.start_ms, args.end_ms)?;
    let cfg = load_settings(args.config_paths)?;
    let svc = connect_service(&cfg).await?;

    let connections = match args.app_id {
        Some(app_id) => {
            svc.get_by_topic_and_app(args.cluster_id, args.topic_name, app_id, start, end)
                .await
        }
        None => {
            svc.get_by_topic(args.cluster_id, args.topic_name, start, end)
                .await
        }
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&connections).context("serialize connections")?
    );
    Ok(())
}

/// Print one app's connections across clusters as JSON.
pub async fn run_app(
    app_id: &str,
    start_ms: i64,
    end_ms: i64,
    config_paths: &[String],
) -> Result<()> {
    let (start, end) = parse_window(start_ms, end_ms)?;
    let cfg = load_settings(config_paths)?;
    let svc = connect_service(&cfg).await?;

    let connections = svc.get_by_app(app_id, start, end).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&connections).context("serialize connections")?
    );
    Ok(())
}
