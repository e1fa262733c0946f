//! Batch dispatch: groups of concurrent analysis calls with a barrier
//! between groups.
//!
//! ## Shape of the fan-out
//!
//! Pages are partitioned into contiguous groups of `chunk_size`. Inside a
//! group every task runs fully in parallel; across groups execution is
//! strictly sequential — no task of group `k+1` starts before all of group
//! `k` have settled. A fixed cooldown is inserted before every group except
//! the first to stay under provider rate limits.
//!
//! ## Failure containment
//!
//! Three layers, none of which aborts the document:
//!
//! * A task that errors after its retries becomes a `Failure` placeholder.
//! * A task that outlives its timeout becomes a `Failure` placeholder; its
//!   siblings are unaffected (each task carries an independent timeout).
//! * A group whose submission itself dies (the spawned group task panics)
//!   substitutes a placeholder for every page in the group, and the next
//!   group still runs.
//!
//! Every submitted task therefore yields exactly one [`PageResult`],
//! matched by ordinal — completion order is unspecified, and restoring
//! page order is the aggregator's job, not ours.

use crate::config::IngestConfig;
use crate::document::Page;
use crate::error::PageError;
use crate::report::PageResult;
use crate::vision::VisionModel;
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// One unit of work: a page plus the prompt it will be analysed with.
///
/// Ephemeral — tasks exist only within one dispatch invocation.
#[derive(Debug, Clone)]
pub struct AnalysisTask {
    pub page: Page,
    pub prompt: String,
    pub max_tokens: u32,
}

/// Submit `tasks` to the vision model in sequential groups of
/// `config.chunk_size`, returning exactly one result per task.
pub async fn dispatch(
    vision: &Arc<dyn VisionModel>,
    tasks: &[AnalysisTask],
    config: &IngestConfig,
) -> Vec<PageResult> {
    if tasks.is_empty() {
        return Vec::new();
    }

    let total = tasks.len();
    let group_count = total.div_ceil(config.chunk_size);
    let mut results = Vec::with_capacity(total);

    for (index, group) in tasks.chunks(config.chunk_size).enumerate() {
        if index > 0 {
            debug!("Cooldown {}ms before group {}", config.group_delay_ms, index + 1);
            sleep(config.group_delay()).await;
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_group_start(index + 1, group_count);
        }
        info!(
            "Dispatching group {}/{}: pages {:?}",
            index + 1,
            group_count,
            group.iter().map(|t| t.page.ordinal).collect::<Vec<_>>()
        );

        results.extend(run_group(vision, group.to_vec(), total, config).await);
    }

    results
}

/// Run one group to completion: all tasks concurrent, settled before
/// returning.
///
/// The group runs inside `tokio::spawn` so that a panic anywhere in the
/// submission is contained: the `JoinError` path substitutes a `Failure`
/// placeholder for every page of the group instead of unwinding through
/// the dispatcher.
pub(crate) async fn run_group(
    vision: &Arc<dyn VisionModel>,
    group: Vec<AnalysisTask>,
    total: usize,
    config: &IngestConfig,
) -> Vec<PageResult> {
    let ordinals: Vec<usize> = group.iter().map(|t| t.page.ordinal).collect();
    let vision = Arc::clone(vision);
    let config = config.clone();

    let handle = tokio::spawn(async move {
        join_all(
            group
                .into_iter()
                .map(|task| analyze_task(Arc::clone(&vision), task, total, config.clone())),
        )
        .await
    });

    match handle.await {
        Ok(results) => results,
        Err(e) => {
            warn!(
                "Group submission failed ({}); recording placeholders for pages {:?}",
                e, ordinals
            );
            let detail = e.to_string();
            ordinals
                .into_iter()
                .map(|page| PageResult::Failure {
                    ordinal: page,
                    reason: PageError::Batch {
                        page,
                        detail: detail.clone(),
                    },
                })
                .collect()
        }
    }
}

/// Analyse one page. Always returns a `PageResult` — never propagates the
/// error upward, so a single bad page cannot abort its group.
///
/// The timeout wraps the whole retried call: a page is bounded by
/// `task_timeout` no matter how its retry budget plays out.
async fn analyze_task(
    vision: Arc<dyn VisionModel>,
    task: AnalysisTask,
    total: usize,
    config: IngestConfig,
) -> PageResult {
    let ordinal = task.page.ordinal;
    let policy = config.retry_policy();
    let label = format!("page {ordinal}");

    let attempt = policy.run(&label, || {
        vision.analyze(&task.page.image_url, &task.prompt, task.max_tokens)
    });

    let result = match timeout(config.task_timeout(), attempt).await {
        Ok(Ok(text)) => PageResult::Success { ordinal, text },
        Ok(Err(e)) => {
            warn!("Page {}: analysis failed — {}", ordinal, e);
            PageResult::Failure {
                ordinal,
                reason: PageError::Analysis {
                    page: ordinal,
                    detail: e.to_string(),
                },
            }
        }
        Err(_) => {
            warn!(
                "Page {}: timed out after {}s",
                ordinal, config.task_timeout_secs
            );
            PageResult::Failure {
                ordinal,
                reason: PageError::Timeout {
                    page: ordinal,
                    secs: config.task_timeout_secs,
                },
            }
        }
    };

    if let Some(ref cb) = config.progress_callback {
        match &result {
            PageResult::Success { text, .. } => cb.on_page_complete(ordinal, total, text.len()),
            PageResult::Failure { reason, .. } => {
                cb.on_page_error(ordinal, total, &reason.to_string())
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VisionError;
    use async_trait::async_trait;

    struct EchoVision;

    #[async_trait]
    impl VisionModel for EchoVision {
        async fn analyze(
            &self,
            image_url: &str,
            _prompt: &str,
            _max_tokens: u32,
        ) -> Result<String, VisionError> {
            Ok(format!("saw {image_url}"))
        }
    }

    fn task(ordinal: usize) -> AnalysisTask {
        AnalysisTask {
            page: Page {
                ordinal,
                image_url: format!("mock://asset/page-{ordinal}.jpg"),
                asset_id: None,
            },
            prompt: "extract".into(),
            max_tokens: 800,
        }
    }

    fn config() -> IngestConfig {
        IngestConfig::builder()
            .chunk_size(2)
            .group_delay_ms(0)
            .max_retries(0)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_task_list_yields_no_results() {
        let vision: Arc<dyn VisionModel> = Arc::new(EchoVision);
        let results = dispatch(&vision, &[], &config()).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn every_task_yields_exactly_one_result() {
        let vision: Arc<dyn VisionModel> = Arc::new(EchoVision);
        let tasks: Vec<AnalysisTask> = (1..=5).map(task).collect();

        let results = dispatch(&vision, &tasks, &config()).await;

        let mut ordinals: Vec<usize> = results.iter().map(|r| r.ordinal()).collect();
        ordinals.sort_unstable();
        assert_eq!(ordinals, vec![1, 2, 3, 4, 5]);
        assert!(results.iter().all(|r| r.is_success()));
    }
}
