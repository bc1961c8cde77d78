//! Executes render jobs inline or on a background thread.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use super::RenderJob;
use crate::document::{MarkdownRenderer, RenderedContent};
use crate::error::EditorError;

/// Stack for the render thread; deep documents walk a deep tree.
const RENDER_STACK_SIZE: usize = 16 * 1024 * 1024;

/// Where renders run.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderBackend {
    /// On the caller's thread when the job is submitted.
    Inline,
    /// On one dedicated worker thread.
    #[default]
    Thread,
}

/// Result of one render job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub version: u64,
    pub result: Result<RenderedContent, EditorError>,
}

/// Runs render jobs; at most one is submitted at a time by the scheduler.
#[derive(Debug)]
pub enum RenderWorker {
    Inline {
        renderer: MarkdownRenderer,
        ready: VecDeque<RenderOutcome>,
    },
    Thread {
        jobs: Option<Sender<RenderJob>>,
        results: Receiver<RenderOutcome>,
        handle: Option<JoinHandle<()>>,
    },
}

impl RenderWorker {
    /// Start a worker; falls back to inline rendering if the thread cannot
    /// be spawned.
    pub fn spawn(backend: RenderBackend, renderer: MarkdownRenderer) -> Self {
        match backend {
            RenderBackend::Inline => Self::inline(renderer),
            RenderBackend::Thread => {
                let (job_tx, job_rx) = mpsc::channel::<RenderJob>();
                let (result_tx, result_rx) = mpsc::channel();
                let thread_renderer = renderer.clone();
                let spawned = std::thread::Builder::new()
                    .name("mdflex-render".to_string())
                    .stack_size(RENDER_STACK_SIZE)
                    .spawn(move || {
                        while let Ok(job) = job_rx.recv() {
                            let outcome = render_guarded(&thread_renderer, &job);
                            if result_tx.send(outcome).is_err() {
                                break;
                            }
                        }
                    });
                match spawned {
                    Ok(handle) => Self::Thread {
                        jobs: Some(job_tx),
                        results: result_rx,
                        handle: Some(handle),
                    },
                    Err(err) => {
                        tracing::warn!(error = %err, "render thread unavailable, rendering inline");
                        Self::inline(renderer)
                    }
                }
            }
        }
    }

    pub fn inline(renderer: MarkdownRenderer) -> Self {
        Self::Inline {
            renderer,
            ready: VecDeque::new(),
        }
    }

    /// Hand `job` to the worker.
    ///
    /// # Errors
    /// Gives the job back when the render thread has stopped. An inline
    /// worker accepts every job.
    pub fn submit(&mut self, job: RenderJob) -> Result<(), RenderJob> {
        match self {
            Self::Inline { renderer, ready } => {
                ready.push_back(render_guarded(renderer, &job));
                Ok(())
            }
            Self::Thread { jobs, .. } => {
                let Some(tx) = jobs.as_ref() else {
                    return Err(job);
                };
                tx.send(job).map_err(|err| {
                    tracing::warn!(version = err.0.version, "render thread has stopped");
                    err.0
                })
            }
        }
    }

    /// Next finished outcome, without blocking.
    pub fn try_recv(&mut self) -> Option<RenderOutcome> {
        match self {
            Self::Inline { ready, .. } => ready.pop_front(),
            Self::Thread { results, .. } => results.try_recv().ok(),
        }
    }

    /// Next finished outcome, waiting for the in-flight job if needed.
    pub fn recv(&mut self) -> Option<RenderOutcome> {
        match self {
            Self::Inline { ready, .. } => ready.pop_front(),
            Self::Thread { results, .. } => results.recv().ok(),
        }
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        if let Self::Thread { jobs, handle, .. } = self {
            jobs.take();
            if let Some(handle) = handle.take() {
                let _ = handle.join();
            }
        }
    }
}

/// Render one job, turning a panic into [`EditorError::RenderFailure`].
pub(crate) fn render_guarded(renderer: &MarkdownRenderer, job: &RenderJob) -> RenderOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| renderer.render(&job.text))).map_err(
        |payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "renderer panicked".to_string());
            EditorError::RenderFailure {
                version: job.version,
                reason,
            }
        },
    );
    RenderOutcome {
        version: job.version,
        result,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::highlight::{HighlightError, Highlighter, Token};

    #[derive(Debug)]
    struct PanickingHighlighter;

    impl Highlighter for PanickingHighlighter {
        fn highlight(&self, _: &str, _: &str) -> Result<Vec<Vec<Token>>, HighlightError> {
            panic!("grammar exploded");
        }
    }

    #[test]
    fn test_inline_worker_renders_on_submit() {
        let mut worker = RenderWorker::spawn(RenderBackend::Inline, MarkdownRenderer::default());
        worker.submit(RenderJob::new(1, "# Hi")).unwrap();
        let outcome = worker.try_recv().unwrap();
        assert_eq!(outcome.version, 1);
        assert_eq!(outcome.result.unwrap().outline()[0].text, "Hi");
        assert!(worker.try_recv().is_none());
    }

    #[test]
    fn test_thread_worker_returns_outcomes_in_order() {
        let mut worker = RenderWorker::spawn(RenderBackend::Thread, MarkdownRenderer::default());
        worker.submit(RenderJob::new(1, "one")).unwrap();
        assert_eq!(worker.recv().unwrap().version, 1);
        worker.submit(RenderJob::new(2, "two")).unwrap();
        assert_eq!(worker.recv().unwrap().version, 2);
    }

    #[test]
    fn test_thread_worker_survives_deeply_nested_quotes() {
        let mut worker = RenderWorker::spawn(RenderBackend::Thread, MarkdownRenderer::default());
        worker
            .submit(RenderJob::new(1, format!("{}end", ">".repeat(100_000))))
            .unwrap();
        let outcome = worker.recv().unwrap();
        assert_eq!(outcome.version, 1);
        assert_eq!(outcome.result.unwrap().plain_text().trim(), "end");
    }

    #[test]
    fn test_stopped_thread_gives_job_back() {
        let (_, results) = mpsc::channel();
        let mut worker = RenderWorker::Thread {
            jobs: None,
            results,
            handle: None,
        };
        let job = RenderJob::new(4, "text");
        assert_eq!(worker.submit(job.clone()), Err(job));
        assert!(worker.try_recv().is_none());
    }

    #[test]
    fn test_panic_becomes_render_failure() {
        let renderer = MarkdownRenderer::new(Arc::new(PanickingHighlighter));
        let outcome = render_guarded(&renderer, &RenderJob::new(7, "```rust\nx\n```"));
        assert_eq!(
            outcome.result,
            Err(EditorError::RenderFailure {
                version: 7,
                reason: "grammar exploded".to_string(),
            })
        );
    }
}
