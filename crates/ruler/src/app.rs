use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::api::{self, AppState};
use crate::config::RulerConfig;
use crate::engine::{EngineContext, GroupStatsStore};
use crate::metrics::EngineMetrics;
use crate::notifier::{self, Dispatcher, LogNotifier, Notifier, RetryNotifier, WebhookNotifier};
use crate::query::{Evaluator, PromQueryClient, QueryBackend};
use crate::recording::{ImportWriter, Materializer, SeriesWriter, UnconfiguredWriter};
use crate::reload::{Reloader, RuleSource};
use crate::scheduler::Scheduler;
use crate::shutdown::{reload_signals, wait_for_shutdown};
use crate::storage::MemoryStore;

pub struct Ruler {
    pub state: AppState,
    pub scheduler: Arc<Scheduler>,
    pub reloader: Arc<Reloader>,
    pub metrics: Arc<EngineMetrics>,
    dispatcher: Dispatcher,
}

pub fn build(cfg: &RulerConfig) -> Ruler {
    let metrics = EngineMetrics::new();
    let (backend, writer) = backends(cfg);

    let mut ctx = EngineContext::new(
        Evaluator::new(backend),
        Arc::new(Materializer::new(writer)),
        Arc::clone(&metrics),
    );
    ctx.external_labels = cfg.external_labels.clone();
    ctx.eval_timeout = cfg.eval_timeout;
    ctx.write_alert_series = cfg.write_alert_series;

    let (sink, dispatcher) = notifier::channel(
        cfg.notifier.queue_capacity,
        notifiers(cfg),
        Arc::clone(&metrics),
    );

    let scheduler = Arc::new(Scheduler::new(
        ctx,
        GroupStatsStore::new(),
        sink,
        cfg.max_concurrent_groups,
    ));
    let reloader = Arc::new(Reloader::new(
        RuleSource::new(cfg.rule_files.clone(), cfg.evaluation_interval),
        Arc::clone(&scheduler),
        Arc::clone(&metrics),
    ));
    let state = AppState::new(Arc::clone(&scheduler), Arc::clone(&metrics))
        .with_reloader(Arc::clone(&reloader));

    Ruler {
        state,
        scheduler,
        reloader,
        metrics,
        dispatcher,
    }
}

fn backends(cfg: &RulerConfig) -> (Arc<dyn QueryBackend>, Arc<dyn SeriesWriter>) {
    let local = MemoryStore::new();

    let backend: Arc<dyn QueryBackend> = match &cfg.query {
        Some(q) => {
            tracing::info!(url = %q.url, "using remote query API");
            Arc::new(PromQueryClient::new(q.url.clone()))
        }
        None => {
            tracing::info!("no query API configured, evaluating against in-memory store");
            Arc::new(local.clone())
        }
    };

    let writer: Arc<dyn SeriesWriter> = match (&cfg.storage, &cfg.query) {
        (Some(s), _) => Arc::new(ImportWriter::new(s.import_url.clone())),
        (None, None) => Arc::new(local),
        (None, Some(_)) => {
            tracing::warn!("no storage.import_url configured, recording rules will fail to write");
            Arc::new(UnconfiguredWriter)
        }
    };

    (backend, writer)
}

fn notifiers(cfg: &RulerConfig) -> Vec<Arc<dyn Notifier>> {
    let mut out: Vec<Arc<dyn Notifier>> = vec![Arc::new(LogNotifier)];
    if let Some(url) = &cfg.notifier.webhook_url {
        out.push(Arc::new(RetryNotifier::new(
            WebhookNotifier::new(url.clone()),
            cfg.notifier.max_retries,
            cfg.notifier.base_delay_ms,
        )));
    }
    out
}

pub async fn run(cfg: RulerConfig) -> anyhow::Result<()> {
    let Ruler {
        state,
        scheduler,
        reloader,
        metrics: _,
        dispatcher,
    } = build(&cfg);

    let cancel = CancellationToken::new();
    let dispatcher_handle = tokio::spawn(dispatcher.run(cancel.child_token()));

    reloader.reload().await.context("loading rule files")?;
    state.mark_ready();

    let listener = TcpListener::bind(&cfg.api_addr)
        .await
        .with_context(|| format!("binding API listener on {}", cfg.api_addr))?;
    tracing::info!(api_addr = %cfg.api_addr, "ruler API server starting");
    let api_handle = tokio::spawn(api::serve(listener, state, cancel.clone()));

    let mut hup = reload_signals();
    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            signal = hup.recv() => match signal {
                Some(()) => {
                    tracing::info!("SIGHUP received, reloading rule files");
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = reloader.reload() => {}
                    }
                }
                None => {
                    (&mut shutdown).await;
                    break;
                }
            },
        }
    }

    tracing::info!("shutting down");
    scheduler.shutdown().await;
    cancel.cancel();

    match api_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::error!(error = %e, "API server failed"),
        Err(e) => tracing::error!(error = %e, "API task panicked"),
    }
    if let Err(e) = dispatcher_handle.await {
        tracing::error!(error = %e, "dispatcher task panicked");
    }

    tracing::info!("ruler stopped");
    Ok(())
}
