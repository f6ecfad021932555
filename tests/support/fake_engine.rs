// ABOUTME: Scriptable in-memory EngineClient that records every call.
// ABOUTME: Containers are keyed by name; ids are "id-<name>" so either form resolves.

use async_trait::async_trait;
use bytes::Bytes;
use cluster_up::engine::{
    ContainerInspection, ContainerSpec, CreatedContainer, EngineClient, EngineError, EngineInfo,
    OutputChunk, OutputStream, ServerVersion, WaitCondition,
};
use cluster_up::types::ContainerId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// How a scripted container terminates.
#[derive(Debug, Clone, Copy)]
pub enum Exit {
    /// Exits on its own with this code.
    Code(i64),
    /// Runs until killed, then exits with this code.
    UntilKilled(i64),
    /// Never exits.
    Never,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit: Exit,
}

impl Script {
    pub fn exits(code: i64) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit: Exit::Code(code),
        }
    }

    pub fn until_killed(code: i64) -> Self {
        Self {
            exit: Exit::UntilKilled(code),
            ..Self::exits(0)
        }
    }

    pub fn never_exits() -> Self {
        Self {
            exit: Exit::Never,
            ..Self::exits(0)
        }
    }

    pub fn stdout(mut self, out: &str) -> Self {
        self.stdout = out.as_bytes().to_vec();
        self
    }

    pub fn stderr(mut self, err: &str) -> Self {
        self.stderr = err.as_bytes().to_vec();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Info,
    Version,
    Create(String),
    Start(String),
    Attach(String),
    Wait(String, WaitCondition),
    Kill(String, String),
    Remove(String, bool),
    Inspect(String),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    specs: Vec<ContainerSpec>,
    scripts: HashMap<String, Script>,
    failures: HashMap<(&'static str, String), EngineError>,
    kill_signals: HashMap<String, Arc<Notify>>,
    created: HashSet<String>,
    removed: HashSet<String>,
    inspections: HashMap<String, ContainerInspection>,
    create_warnings: Vec<String>,
    create_delays: HashMap<String, Duration>,
    info_error: Option<EngineError>,
    api_version: String,
    security_options: Vec<String>,
    insecure_registry_cidrs: Vec<String>,
}

impl State {
    fn failure(&self, op: &'static str, key: &str) -> Option<EngineError> {
        self.failures.get(&(op, key.to_string())).cloned()
    }

    fn kill_signal(&mut self, key: &str) -> Arc<Notify> {
        Arc::clone(self.kill_signals.entry(key.to_string()).or_default())
    }

    fn exists(&self, key: &str) -> bool {
        !self.removed.contains(key)
            && (self.created.contains(key) || self.inspections.contains_key(key))
    }
}

pub struct FakeEngine {
    state: Mutex<State>,
}

fn key(target: &str) -> String {
    target.strip_prefix("id-").unwrap_or(target).to_string()
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                api_version: "1.41".to_string(),
                insecure_registry_cidrs: vec!["127.0.0.0/8".to_string(), "172.30.0.0/16".to_string()],
                ..State::default()
            }),
        }
    }

    pub fn into_arc(self) -> Arc<FakeEngine> {
        Arc::new(self)
    }

    pub fn script(self, name: &str, script: Script) -> Self {
        self.state.lock().scripts.insert(name.to_string(), script);
        self
    }

    /// Make `op` ("create", "start", "attach", "wait", "kill", "remove",
    /// "inspect") fail for container `name`.
    pub fn fail(self, op: &'static str, name: &str, err: EngineError) -> Self {
        self.state.lock().failures.insert((op, name.to_string()), err);
        self
    }

    pub fn fail_info(self, err: EngineError) -> Self {
        self.state.lock().info_error = Some(err);
        self
    }

    pub fn api_version(self, version: &str) -> Self {
        self.state.lock().api_version = version.to_string();
        self
    }

    pub fn security_options(self, options: &[&str]) -> Self {
        self.state.lock().security_options = options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn insecure_registries(self, cidrs: &[&str]) -> Self {
        self.state.lock().insecure_registry_cidrs = cidrs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn create_warnings(self, warnings: &[&str]) -> Self {
        self.state.lock().create_warnings = warnings.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Pretend a container named `name` already exists.
    /// Holds `create` for `name` this long before the container exists.
    pub fn create_delay(self, name: &str, delay: Duration) -> Self {
        self.state.lock().create_delays.insert(name.to_string(), delay);
        self
    }

    pub fn existing(self, name: &str, running: bool) -> Self {
        let inspection = ContainerInspection {
            id: ContainerId::new(format!("id-{name}")),
            name: name.to_string(),
            running,
            status: if running { "running" } else { "exited" }.to_string(),
        };
        self.state.lock().inspections.insert(name.to_string(), inspection);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn specs(&self) -> Vec<ContainerSpec> {
        self.state.lock().specs.clone()
    }

    pub fn spec(&self, name: &str) -> Option<ContainerSpec> {
        self.specs().into_iter().find(|s| s.name == name)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn creates(&self, name: &str) -> usize {
        self.count(|c| matches!(c, Call::Create(n) if n == name))
    }

    pub fn kills(&self, name: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Kill(n, signal) if n == name => Some(signal),
                _ => None,
            })
            .collect()
    }

    pub fn removes(&self, name: &str) -> usize {
        self.count(|c| matches!(c, Call::Remove(n, true) if n == name))
    }

    fn record(&self, call: Call) {
        self.state.lock().calls.push(call);
    }
}

#[async_trait]
impl EngineClient for FakeEngine {
    async fn info(&self) -> Result<EngineInfo, EngineError> {
        self.record(Call::Info);
        let state = self.state.lock();
        if let Some(err) = &state.info_error {
            return Err(err.clone());
        }
        Ok(EngineInfo {
            kernel_version: Some("6.1.0".to_string()),
            security_options: state.security_options.clone(),
            insecure_registry_cidrs: state.insecure_registry_cidrs.clone(),
        })
    }

    async fn server_version(&self) -> Result<ServerVersion, EngineError> {
        self.record(Call::Version);
        Ok(ServerVersion {
            api_version: self.state.lock().api_version.clone(),
            version: "fake".to_string(),
        })
    }

    async fn create_container(
        &self,
        spec: &ContainerSpec,
    ) -> Result<CreatedContainer, EngineError> {
        self.record(Call::Create(spec.name.clone()));
        let delay = self.state.lock().create_delays.get(&spec.name).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock();
        state.specs.push(spec.clone());
        if let Some(err) = state.failure("create", &spec.name) {
            return Err(err);
        }
        state.created.insert(spec.name.clone());
        state.removed.remove(&spec.name);
        Ok(CreatedContainer {
            id: ContainerId::new(format!("id-{}", spec.name)),
            warnings: state.create_warnings.clone(),
        })
    }

    async fn start_container(&self, target: &str) -> Result<(), EngineError> {
        let key = key(target);
        self.record(Call::Start(key.clone()));
        match self.state.lock().failure("start", &key) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn attach_container(&self, target: &str) -> Result<OutputStream, EngineError> {
        let key = key(target);
        self.record(Call::Attach(key.clone()));
        let state = self.state.lock();
        if let Some(err) = state.failure("attach", &key) {
            return Err(err);
        }

        let mut frames = Vec::new();
        if let Some(script) = state.scripts.get(&key) {
            if !script.stdout.is_empty() {
                frames.push(Ok(OutputChunk::Stdout(Bytes::from(script.stdout.clone()))));
            }
            if !script.stderr.is_empty() {
                frames.push(Ok(OutputChunk::Stderr(Bytes::from(script.stderr.clone()))));
            }
        }
        Ok(Box::pin(futures::stream::iter(frames)))
    }

    async fn wait_container(
        &self,
        target: &str,
        condition: WaitCondition,
    ) -> Result<i64, EngineError> {
        let key = key(target);
        self.record(Call::Wait(key.clone(), condition));
        let (exit, signal, failure) = {
            let mut state = self.state.lock();
            let exit = state
                .scripts
                .get(&key)
                .map(|s| s.exit)
                .unwrap_or(Exit::Code(0));
            (exit, state.kill_signal(&key), state.failure("wait", &key))
        };
        if let Some(err) = failure {
            return Err(err);
        }

        match exit {
            Exit::Code(code) => Ok(code),
            Exit::UntilKilled(code) => {
                signal.notified().await;
                Ok(code)
            }
            Exit::Never => std::future::pending().await,
        }
    }

    async fn kill_container(&self, target: &str, signal: &str) -> Result<(), EngineError> {
        let key = key(target);
        self.record(Call::Kill(key.clone(), signal.to_string()));
        let mut state = self.state.lock();
        if let Some(err) = state.failure("kill", &key) {
            return Err(err);
        }
        if !state.exists(&key) {
            return Err(EngineError::NotFound(format!("No such container: {key}")));
        }
        state.kill_signal(&key).notify_one();
        Ok(())
    }

    async fn remove_container(&self, target: &str, force: bool) -> Result<(), EngineError> {
        let key = key(target);
        self.record(Call::Remove(key.clone(), force));
        let mut state = self.state.lock();
        if let Some(err) = state.failure("remove", &key) {
            return Err(err);
        }
        if !state.exists(&key) {
            return Err(EngineError::NotFound(format!("No such container: {key}")));
        }
        state.removed.insert(key);
        Ok(())
    }

    async fn inspect_container(&self, target: &str) -> Result<ContainerInspection, EngineError> {
        let key = key(target);
        self.record(Call::Inspect(key.clone()));
        let state = self.state.lock();
        if let Some(err) = state.failure("inspect", &key) {
            return Err(err);
        }
        state
            .inspections
            .get(&key)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {key}")))
    }
}
