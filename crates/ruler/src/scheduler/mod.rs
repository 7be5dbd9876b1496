mod status;
mod task;

pub use status::{ActiveAlert, GroupStatus, RuleStatus};

use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use sentinel_common::time::now_ms;

use crate::engine::{resolve_rules, EngineContext, GroupRuntime, GroupStatsStore, TickReport};
use crate::notifier::EventSink;
use crate::rules::{GroupDef, RuleSet};
use status::GroupSnapshot;
use task::{finish_tick, GroupLoop};

pub(crate) struct Shared {
    pub ctx: EngineContext,
    pub stats: GroupStatsStore,
    pub sink: EventSink,
    pub permits: Arc<Semaphore>,
    pub root: CancellationToken,
    pub tracker: TaskTracker,
    // Published under the group's runtime lock; API readers never take that lock.
    snapshots: DashMap<String, GroupSnapshot>,
}

impl Shared {
    fn publish_status(&self, runtime: &GroupRuntime) {
        self.snapshots
            .insert(runtime.name().to_string(), GroupSnapshot::of(runtime));
    }

    fn sorted_snapshots(&self) -> Vec<GroupSnapshot> {
        let mut out: Vec<GroupSnapshot> = self.snapshots.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| a.status.name.cmp(&b.status.name));
        out
    }
}

struct GroupHandle {
    def: GroupDef,
    runtime: Arc<Mutex<GroupRuntime>>,
    token: CancellationToken,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    pub added: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub resolved: usize,
}

// The new runtime stays locked until the old state has been moved into it.
struct Carry {
    def: GroupDef,
    old: GroupHandle,
    target: OwnedMutexGuard<GroupRuntime>,
}

pub struct Scheduler {
    shared: Arc<Shared>,
    groups: RwLock<HashMap<String, GroupHandle>>,
    rule_set: RwLock<Arc<RuleSet>>,
    reload_lock: Mutex<()>,
    spawn_loops: bool,
}

impl Scheduler {
    pub fn new(
        ctx: EngineContext,
        stats: GroupStatsStore,
        sink: EventSink,
        max_concurrent_groups: usize,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                ctx,
                stats,
                sink,
                permits: Arc::new(Semaphore::new(max_concurrent_groups.max(1))),
                root: CancellationToken::new(),
                tracker: TaskTracker::new(),
                snapshots: DashMap::new(),
            }),
            groups: RwLock::new(HashMap::new()),
            rule_set: RwLock::new(Arc::new(RuleSet::default())),
            reload_lock: Mutex::new(()),
            spawn_loops: true,
        }
    }

    pub fn manual(mut self) -> Self {
        self.spawn_loops = false;
        self
    }

    pub fn context(&self) -> &EngineContext {
        &self.shared.ctx
    }

    pub fn stats(&self) -> &GroupStatsStore {
        &self.shared.stats
    }

    pub async fn rule_set(&self) -> Arc<RuleSet> {
        Arc::clone(&*self.rule_set.read().await)
    }

    pub async fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Swaps in a new rule set. Unchanged groups keep their loop and state,
    /// changed groups restart with state carried over for identical rules,
    /// removed groups resolve what was firing. In-flight ticks of changed
    /// and removed groups are cancelled.
    pub async fn reload(&self, set: RuleSet) -> ReloadSummary {
        let _serial = self.reload_lock.lock().await;
        let now = now_ms();
        let mut summary = ReloadSummary::default();
        let mut carries = Vec::new();
        let mut retired = Vec::new();

        {
            let mut groups = self.groups.write().await;
            let mut previous = std::mem::take(&mut *groups);

            for def in &set.groups {
                match previous.remove(&def.name) {
                    Some(mut handle) if handle.def.same_definition(def) => {
                        handle.def = def.clone();
                        if let Some(mut snap) = self.shared.snapshots.get_mut(&def.name) {
                            snap.status.file = def.file.clone();
                        }
                        groups.insert(def.name.clone(), handle);
                        summary.unchanged += 1;
                    }
                    Some(old) => {
                        old.token.cancel();
                        let runtime = Arc::new(Mutex::new(GroupRuntime::new(def.clone())));
                        let target = Arc::clone(&runtime).lock_owned().await;
                        groups.insert(def.name.clone(), self.start_group(def, runtime));
                        carries.push(Carry {
                            def: def.clone(),
                            old,
                            target,
                        });
                        summary.changed += 1;
                    }
                    None => {
                        let fresh = GroupRuntime::new(def.clone());
                        self.shared.publish_status(&fresh);
                        let runtime = Arc::new(Mutex::new(fresh));
                        groups.insert(def.name.clone(), self.start_group(def, runtime));
                        summary.added += 1;
                    }
                }
            }

            for (_, old) in previous {
                old.token.cancel();
                retired.push(old);
            }
            summary.removed = retired.len();
            *self.rule_set.write().await = Arc::new(set);
        }

        let external = &self.shared.ctx.external_labels;
        let mut events = Vec::new();

        for mut carry in carries {
            let rules = carry.old.runtime.lock().await.take_rules();
            let (runtime, leftovers) = GroupRuntime::with_previous(carry.def, rules);
            events.extend(resolve_rules(runtime.name(), leftovers, now, external));
            self.shared.publish_status(&runtime);
            *carry.target = runtime;
        }

        for old in retired {
            events.extend(old.runtime.lock().await.resolve_all(now, external));
            self.shared.stats.remove(&old.def.name);
            self.shared.snapshots.remove(&old.def.name);
            tracing::info!(group = %old.def.name, "group removed");
        }

        summary.resolved = events.len();
        self.shared.sink.publish(events);
        tracing::info!(
            added = summary.added,
            changed = summary.changed,
            unchanged = summary.unchanged,
            removed = summary.removed,
            resolved = summary.resolved,
            "rule set applied"
        );
        summary
    }

    fn start_group(&self, def: &GroupDef, runtime: Arc<Mutex<GroupRuntime>>) -> GroupHandle {
        let token = self.shared.root.child_token();
        self.shared.stats.register(&def.name, def.interval);
        if self.spawn_loops {
            GroupLoop {
                name: def.name.clone(),
                interval: def.interval,
                runtime: Arc::clone(&runtime),
                token: token.clone(),
                shared: Arc::clone(&self.shared),
            }
            .spawn();
        }
        GroupHandle {
            def: def.clone(),
            runtime,
            token,
        }
    }

    pub async fn evaluate_now(&self, group: &str, ts_ms: i64) -> Option<TickReport> {
        let runtime = {
            let groups = self.groups.read().await;
            Arc::clone(&groups.get(group)?.runtime)
        };
        let mut runtime = runtime.lock().await;
        let report = runtime.evaluate(ts_ms, &self.shared.ctx).await;
        finish_tick(group, report.clone(), &runtime, &self.shared);
        Some(report)
    }

    pub fn groups(&self) -> Vec<GroupStatus> {
        self.shared
            .sorted_snapshots()
            .into_iter()
            .map(|s| s.status)
            .collect()
    }

    pub fn active_alerts(&self) -> Vec<ActiveAlert> {
        self.shared
            .sorted_snapshots()
            .into_iter()
            .flat_map(|s| s.alerts)
            .collect()
    }

    pub async fn shutdown(&self) {
        self.shared.root.cancel();
        self.shared.tracker.close();
        self.shared.tracker.wait().await;
        tracing::info!("scheduler stopped");
    }
}
