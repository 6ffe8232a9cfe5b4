use crate::archive::archive_dir;
use crate::config::Settings;
use crate::matcher::PatternSet;
use crate::resolver::resolve_pod_dirs;
use crate::types::{ArchivePolicy, PodRef};
use crate::utils::drain_tasks;
use anyhow::Context;
use futures::stream::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{ApiResource, DynamicObject, ListParams};
use kube::runtime::WatchStreamExt;
use kube::runtime::watcher::{Config as WatcherConfig, Event, watcher};
use kube::{Api, Client, ResourceExt, config};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A watch payload, decoded as a pod if possible.
#[derive(Debug)]
pub enum PodNotification {
    Pod { pod: Box<Pod>, deleted: bool },
    Unrecognized { kind: String, name: String, reason: String },
}

pub fn decode_notification(obj: DynamicObject, deleted: bool) -> PodNotification {
    let kind = obj
        .types
        .as_ref()
        .map(|t| t.kind.clone())
        .unwrap_or_else(|| "<none>".to_string());
    let name = obj.name_any();

    match obj.try_parse::<Pod>() {
        Ok(pod) => PodNotification::Pod {
            pod: Box::new(pod),
            deleted,
        },
        Err(e) => PodNotification::Unrecognized {
            kind,
            name,
            reason: e.to_string(),
        },
    }
}

/// The pod to archive if the notification is a termination signal: the
/// object was deleted or carries a deletion timestamp.
pub fn termination_target(pod: &Pod, deleted: bool) -> Option<PodRef> {
    if deleted || pod.metadata.deletion_timestamp.is_some() {
        Some(PodRef::new(pod.namespace().unwrap_or_default(), pod.name_any()))
    } else {
        None
    }
}

/// Termination target of a notification whose namespace passes `patterns`.
pub fn archival_target(notification: &PodNotification, patterns: &PatternSet) -> Option<PodRef> {
    match notification {
        PodNotification::Pod { pod, deleted } => termination_target(pod, *deleted)
            .filter(|target| patterns.should_archive(&target.namespace)),
        PodNotification::Unrecognized { .. } => None,
    }
}

pub async fn initialize_client() -> anyhow::Result<Client> {
    let config = config::Config::infer()
        .await
        .context("failed to load cluster configuration")?;
    let client = Client::try_from(config).context("failed to create Kubernetes client")?;
    Ok(client)
}

fn pods_api(client: Client) -> Api<DynamicObject> {
    Api::all_with(client, &ApiResource::erase::<Pod>(&()))
}

/// Archives the logs of pods as they terminate.
pub struct EventTrigger {
    api: Api<DynamicObject>,
    settings: Arc<Settings>,
    tasks: JoinSet<()>,
}

impl EventTrigger {
    /// Verify pods can be listed before committing to the watch.
    pub async fn connect(client: Client, settings: Arc<Settings>) -> anyhow::Result<Self> {
        let api = pods_api(client);
        let mut lp = ListParams::default().limit(1);
        if let Some(node) = &settings.node_name {
            lp = lp.fields(&format!("spec.nodeName={}", node));
        }
        api.list(&lp)
            .await
            .context("failed to list pods, cannot start the pod watch")?;

        Ok(Self {
            api,
            settings,
            tasks: JoinSet::new(),
        })
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut cfg = WatcherConfig::default();
        if let Some(node) = &self.settings.node_name {
            cfg = cfg.fields(&format!("spec.nodeName={}", node));
            info!("Watching pods on node {}", node);
        } else {
            info!("Watching pods in all namespaces");
        }

        let mut stream = watcher(self.api.clone(), cfg).default_backoff().boxed();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = stream.next() => match event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => warn!("Pod watch error: {}", e),
                    None => {
                        warn!("Pod watch stream ended");
                        break;
                    }
                }
            }
            self.reap_finished();
        }

        let abandoned = drain_tasks(&mut self.tasks, self.settings.shutdown_grace).await;
        if abandoned > 0 {
            warn!("Abandoned {} archival tasks still running", abandoned);
        }
        info!("Pod watch stopped");
    }

    fn handle_event(&mut self, event: Event<DynamicObject>) {
        match event {
            Event::Apply(obj) | Event::InitApply(obj) => {
                self.handle_notification(decode_notification(obj, false))
            }
            Event::Delete(obj) => self.handle_notification(decode_notification(obj, true)),
            Event::Init => info!("Initializing pod watcher"),
            Event::InitDone => info!("Pod watcher initialization complete"),
        }
    }

    fn handle_notification(&mut self, notification: PodNotification) {
        if let PodNotification::Unrecognized { kind, name, reason } = &notification {
            warn!("Ignoring object {} of kind {}: not a pod: {}", name, kind, reason);
            return;
        }

        if let PodNotification::Pod { pod, deleted } = &notification {
            let phase = pod
                .status
                .as_ref()
                .and_then(|s| s.phase.as_deref())
                .unwrap_or("Unknown");
            debug!(
                "Pod {}/{} | Phase: {} | Deleted: {} | Terminating: {}",
                pod.namespace().unwrap_or_default(),
                pod.name_any(),
                phase,
                deleted,
                pod.metadata.deletion_timestamp.is_some()
            );
        }

        if let Some(target) = archival_target(&notification, &self.settings.patterns) {
            info!("[{}] Pod terminating, archiving its logs", target);
            self.tasks.spawn(archive_pod(self.settings.clone(), target));
        }
    }

    fn reap_finished(&mut self) {
        while let Some(res) = self.tasks.try_join_next() {
            if let Err(e) = res {
                error!("Archival task failed: {}", e);
            }
        }
    }
}

/// Archive every log directory of a terminating pod, one blocking job per directory.
pub async fn archive_pod(settings: Arc<Settings>, pod: PodRef) {
    let lookup = {
        let settings = settings.clone();
        let pod = pod.clone();
        tokio::task::spawn_blocking(move || resolve_pod_dirs(&settings.log_root, &pod)).await
    };

    let dirs = match lookup {
        Ok(Ok(dirs)) => dirs,
        Ok(Err(e)) => {
            error!(
                "[{}] Failed to look up log directories in {}: {}",
                pod,
                settings.log_root.display(),
                e
            );
            return;
        }
        Err(e) => {
            error!("[{}] Log directory lookup failed: {}", pod, e);
            return;
        }
    };

    if dirs.is_empty() {
        warn!("[{}] No log directory found", pod);
        return;
    }

    let mut jobs = JoinSet::new();
    for dir in dirs {
        let settings = settings.clone();
        let pod = pod.clone();
        jobs.spawn_blocking(move || {
            info!("[{}] Checking directory {}", pod, dir.display());
            archive_dir(&dir, &pod, ArchivePolicy::Event, &settings)
        });
    }

    while let Some(res) = jobs.join_next().await {
        match res {
            Ok(report) => info!(
                "[{}] {} copied, {} skipped, {} removed, {} errors",
                pod,
                report.copied,
                report.skipped,
                report.removed,
                report.errors.len()
            ),
            Err(e) => error!("[{}] Archival job failed: {}", pod, e),
        }
    }
}
