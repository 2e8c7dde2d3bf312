//! Running a job across many pages at once.
//!
//! Each page is scanned on tokio's blocking pool (the engines are synchronous
//! and CPU-bound); at most `Config::max_concurrent` pages are in flight.
//! Results come back in the store's title order whatever order they finish in.

use std::sync::Arc;

use futures::{StreamExt, stream};

use crate::config::Config;
use crate::jobs::Job;
use crate::pages::PageStore;
use crate::wikitext::errors::{Result, WtError};
use crate::wikitext::wiki_text::WikiText;

/// What happened to one page.
#[derive(Debug)]
pub struct PageOutcome {
    pub title: String,
    /// New markup when the job changed the page, `None` when it did not.
    pub result: Result<Option<String>>,
}

impl PageOutcome {
    pub fn changed(&self) -> bool {
        matches!(self.result, Ok(Some(_)))
    }
}

fn process_page(
    store: &dyn PageStore,
    job: &dyn Job,
    title: &str,
    submit: bool,
    config: &Config,
) -> Result<Option<String>> {
    let markup = store.fetch_markup(title)?;
    let page = WikiText::for_page(title, markup).with_context_chars(config.context_chars);
    let Some(new_markup) = job.apply(&page)? else {
        log::debug!("[{}] {}: no change", job.name(), title);
        return Ok(None);
    };
    if submit {
        store.submit_markup(title, &new_markup, &config.summary)?;
    }
    log::debug!("[{}] {}: changed", job.name(), title);
    Ok(Some(new_markup))
}

fn log_summary(job_name: &str, outcomes: &[PageOutcome]) {
    let passed = outcomes.iter().filter(|o| o.result.is_ok()).count();
    for failed in outcomes.iter().filter_map(|o| o.result.as_ref().err().map(|e| (&o.title, e))) {
        log::error!("[{}] {}: {}", job_name, failed.0, failed.1);
    }
    log::info!(
        "[{}] Total: {}. Passed: {}. Rate: {:.2}%",
        job_name,
        outcomes.len(),
        passed,
        if outcomes.is_empty() {
            0.0
        } else {
            (passed as f64 / outcomes.len() as f64) * 100.0
        }
    );
}

/// Apply `job` to every page of `store`. With `submit`, changed pages are
/// written back with `config.summary`.
///
/// A failing page does not stop the batch; its error is in its outcome.
pub async fn run_batch(
    store: Arc<dyn PageStore>,
    job: Arc<dyn Job>,
    config: &Config,
    submit: bool,
) -> Result<Vec<PageOutcome>> {
    let titles = store.titles()?;
    let limit = config.max_concurrent.max(1);

    let mut indexed: Vec<(usize, PageOutcome)> = stream::iter(titles.into_iter().enumerate())
        .map(|(index, title)| {
            let store = Arc::clone(&store);
            let job = Arc::clone(&job);
            let config = config.clone();
            async move {
                let task_title = title.clone();
                let result = tokio::task::spawn_blocking(move || {
                    process_page(store.as_ref(), job.as_ref(), &task_title, submit, &config)
                })
                .await
                .unwrap_or_else(|e| Err(WtError::other_with_source("page task failed", Some(e))));
                (index, PageOutcome { title, result })
            }
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    indexed.sort_by_key(|(index, _)| *index);
    let outcomes: Vec<PageOutcome> = indexed.into_iter().map(|(_, outcome)| outcome).collect();
    log_summary(job.name(), &outcomes);
    Ok(outcomes)
}
