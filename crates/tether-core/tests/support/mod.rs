//! In-memory manager used by the integration tests.
//!
//! Records every remote call in order and plays back scripted workflow
//! executions, one script step per status poll.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tether_core::blueprint::BlueprintSource;
use tether_core::error::RemoteError;
use tether_core::remote::{
    Blueprint, Deployment, EventLevel, Execution, ExecutionEvent, ExecutionState, ManagerClient,
    Package, RemoteResult, ValueMap,
};

/// One status poll worth of progress.
#[derive(Debug, Clone)]
pub struct ScriptStep {
    pub state: ExecutionState,
    pub events: Vec<ExecutionEvent>,
}

pub fn step(state: ExecutionState, events: &[(u64, EventLevel, &str)]) -> ScriptStep {
    ScriptStep {
        state,
        events: events
            .iter()
            .map(|(cursor, level, message)| event(*cursor, *level, message))
            .collect(),
    }
}

pub fn event(cursor: u64, level: EventLevel, message: &str) -> ExecutionEvent {
    ExecutionEvent {
        cursor,
        timestamp: None,
        level,
        node_instance: None,
        message: message.to_string(),
    }
}

pub fn succeeding_workflow() -> Vec<ScriptStep> {
    vec![
        step(ExecutionState::Started, &[(1, EventLevel::Info, "starting")]),
        step(ExecutionState::Succeeded, &[(2, EventLevel::Info, "done")]),
    ]
}

pub fn failing_workflow() -> Vec<ScriptStep> {
    vec![
        step(ExecutionState::Started, &[(1, EventLevel::Info, "starting")]),
        step(ExecutionState::Failed, &[(2, EventLevel::Error, "boom")]),
    ]
}

pub fn cancelled_workflow() -> Vec<ScriptStep> {
    vec![
        step(ExecutionState::Started, &[(1, EventLevel::Info, "starting")]),
        step(ExecutionState::Cancelled, &[(2, EventLevel::Warning, "cancelled by user")]),
    ]
}

pub fn map(value: Value) -> ValueMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

/// Log output written while `f` runs on this thread.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
    (value, logs)
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct RunningExecution {
    execution: Execution,
    script: Vec<ScriptStep>,
    /// Number of script steps revealed so far.
    revealed: usize,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<String>,
    blueprints: BTreeMap<String, Blueprint>,
    uploads: Vec<(String, BlueprintSource)>,
    packages: BTreeSet<String>,
    deployments: BTreeMap<String, Deployment>,
    outputs: HashMap<String, ValueMap>,
    capabilities: HashMap<String, ValueMap>,
    scripts: HashMap<String, Vec<ScriptStep>>,
    executions: BTreeMap<String, RunningExecution>,
    started: Vec<(String, String, ValueMap)>,
    failures: BTreeSet<String>,
    missing: BTreeSet<String>,
    package_uploads: Vec<(PathBuf, PathBuf)>,
    replay_all_events: bool,
    next_execution: u64,
}

#[derive(Debug, Default)]
pub struct FakeManager {
    state: Mutex<State>,
}

impl FakeManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blueprint(self, id: &str) -> Self {
        self.state.lock().unwrap().blueprints.insert(
            id.to_string(),
            Blueprint {
                id: id.to_string(),
                main_file_name: None,
            },
        );
        self
    }

    pub fn with_deployment(self, id: &str, blueprint_id: &str) -> Self {
        self.state.lock().unwrap().deployments.insert(
            id.to_string(),
            Deployment {
                id: id.to_string(),
                blueprint_id: blueprint_id.to_string(),
                inputs: ValueMap::new(),
            },
        );
        self
    }

    pub fn with_packages(self, packages: &[&str]) -> Self {
        self.state
            .lock()
            .unwrap()
            .packages
            .extend(packages.iter().map(|p| p.to_string()));
        self
    }

    /// Script every execution of `workflow_id`.
    pub fn with_workflow(self, workflow_id: &str, script: Vec<ScriptStep>) -> Self {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(workflow_id.to_string(), script);
        self
    }

    pub fn with_outputs(self, deployment_id: &str, outputs: ValueMap, capabilities: ValueMap) -> Self {
        let mut state = self.state.lock().unwrap();
        state.outputs.insert(deployment_id.to_string(), outputs);
        state
            .capabilities
            .insert(deployment_id.to_string(), capabilities);
        drop(state);
        self
    }

    /// Make `operation` (e.g. `"delete_deployment:dep1"`) fail with a request error.
    pub fn failing(self, operation: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation.to_string());
        self
    }

    /// Make `operation` fail as if the manager did not know the resource.
    pub fn missing(self, operation: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .missing
            .insert(operation.to_string());
        self
    }

    /// Ignore the `after` cursor and return every revealed event on each call.
    pub fn replaying_all_events(self) -> Self {
        self.state.lock().unwrap().replay_all_events = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn uploads(&self) -> Vec<(String, BlueprintSource)> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn package_uploads(&self) -> Vec<(PathBuf, PathBuf)> {
        self.state.lock().unwrap().package_uploads.clone()
    }

    pub fn started(&self) -> Vec<(String, String, ValueMap)> {
        self.state.lock().unwrap().started.clone()
    }

    pub fn has_blueprint(&self, id: &str) -> bool {
        self.state.lock().unwrap().blueprints.contains_key(id)
    }

    pub fn deployment(&self, id: &str) -> Option<Deployment> {
        self.state.lock().unwrap().deployments.get(id).cloned()
    }

    fn record(&self, call: String) -> RemoteResult<()> {
        let mut state = self.state.lock().unwrap();
        let failing = state.failures.contains(&call);
        let missing = state.missing.contains(&call);
        state.calls.push(call.clone());
        if failing {
            return Err(RemoteError::request(format!("injected failure: {call}")));
        }
        if missing {
            return Err(RemoteError::not_found("resource", call));
        }
        Ok(())
    }
}

impl ManagerClient for FakeManager {
    fn get_blueprint(&self, id: &str) -> RemoteResult<Blueprint> {
        self.record(format!("get_blueprint:{id}"))?;
        self.state
            .lock()
            .unwrap()
            .blueprints
            .get(id)
            .cloned()
            .ok_or_else(|| RemoteError::not_found("blueprint", id))
    }

    fn upload_blueprint(&self, id: &str, source: &BlueprintSource) -> RemoteResult<Blueprint> {
        self.record(format!("upload_blueprint:{id}"))?;
        let mut state = self.state.lock().unwrap();
        state.uploads.push((id.to_string(), source.clone()));
        let blueprint = Blueprint {
            id: id.to_string(),
            main_file_name: Some(source.main_file().to_string()),
        };
        state.blueprints.insert(id.to_string(), blueprint.clone());
        Ok(blueprint)
    }

    fn delete_blueprint(&self, id: &str) -> RemoteResult<()> {
        self.record(format!("delete_blueprint:{id}"))?;
        self.state
            .lock()
            .unwrap()
            .blueprints
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::not_found("blueprint", id))
    }

    fn list_installed_packages(&self) -> RemoteResult<BTreeSet<String>> {
        self.record("list_installed_packages".to_string())?;
        Ok(self.state.lock().unwrap().packages.clone())
    }

    fn upload_package(&self, wagon: &Path, yaml: &Path) -> RemoteResult<Package> {
        self.record(format!("upload_package:{}", wagon.display()))?;
        let mut state = self.state.lock().unwrap();
        let name = wagon
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        state
            .package_uploads
            .push((wagon.to_path_buf(), yaml.to_path_buf()));
        state.packages.insert(name.clone());
        Ok(Package {
            id: format!("pkg-{}", state.package_uploads.len()),
            package_name: name,
            package_version: "1.0".to_string(),
        })
    }

    fn create_deployment(
        &self,
        blueprint_id: &str,
        id: &str,
        inputs: &ValueMap,
    ) -> RemoteResult<Deployment> {
        self.record(format!("create_deployment:{id}"))?;
        let mut state = self.state.lock().unwrap();
        if !state.blueprints.contains_key(blueprint_id) {
            return Err(RemoteError::not_found("blueprint", blueprint_id));
        }
        if state.deployments.contains_key(id) {
            return Err(RemoteError::Conflict {
                kind: "deployment",
                id: id.to_string(),
            });
        }
        let deployment = Deployment {
            id: id.to_string(),
            blueprint_id: blueprint_id.to_string(),
            inputs: inputs.clone(),
        };
        state.deployments.insert(id.to_string(), deployment.clone());
        Ok(deployment)
    }

    fn delete_deployment(&self, id: &str) -> RemoteResult<()> {
        self.record(format!("delete_deployment:{id}"))?;
        self.state
            .lock()
            .unwrap()
            .deployments
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RemoteError::not_found("deployment", id))
    }

    fn start_execution(
        &self,
        deployment_id: &str,
        workflow_id: &str,
        parameters: &ValueMap,
    ) -> RemoteResult<Execution> {
        self.record(format!("start_execution:{deployment_id}:{workflow_id}"))?;
        let mut state = self.state.lock().unwrap();
        if !state.deployments.contains_key(deployment_id) {
            return Err(RemoteError::not_found("deployment", deployment_id));
        }
        state.next_execution += 1;
        let id = format!("exec-{}", state.next_execution);
        let script = state
            .scripts
            .get(workflow_id)
            .cloned()
            .unwrap_or_else(succeeding_workflow);
        let execution = Execution {
            id: id.clone(),
            workflow_id: workflow_id.to_string(),
            deployment_id: deployment_id.to_string(),
            state: ExecutionState::Pending,
            error: None,
        };
        state.executions.insert(
            id,
            RunningExecution {
                execution: execution.clone(),
                script,
                revealed: 0,
            },
        );
        state.started.push((
            deployment_id.to_string(),
            workflow_id.to_string(),
            parameters.clone(),
        ));
        Ok(execution)
    }

    fn get_execution(&self, id: &str) -> RemoteResult<Execution> {
        self.record(format!("get_execution:{id}"))?;
        let mut state = self.state.lock().unwrap();
        let running = state
            .executions
            .get_mut(id)
            .ok_or_else(|| RemoteError::not_found("execution", id))?;
        if running.revealed < running.script.len() {
            running.execution.state = running.script[running.revealed].state;
            running.revealed += 1;
        }
        if running.execution.state == ExecutionState::Failed {
            running.execution.error = Some("workflow failed".to_string());
        }
        Ok(running.execution.clone())
    }

    fn list_execution_events(
        &self,
        execution_id: &str,
        after: Option<u64>,
    ) -> RemoteResult<Vec<ExecutionEvent>> {
        self.record(format!("list_execution_events:{execution_id}"))?;
        let state = self.state.lock().unwrap();
        let running = state
            .executions
            .get(execution_id)
            .ok_or_else(|| RemoteError::not_found("execution", execution_id))?;
        let replay = state.replay_all_events;
        Ok(running.script[..running.revealed]
            .iter()
            .flat_map(|step| step.events.iter().cloned())
            .filter(|e| replay || after.is_none_or(|seen| e.cursor > seen))
            .collect())
    }

    fn get_outputs(&self, deployment_id: &str) -> RemoteResult<ValueMap> {
        self.record(format!("get_outputs:{deployment_id}"))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .outputs
            .get(deployment_id)
            .cloned()
            .unwrap_or_default())
    }

    fn get_capabilities(&self, deployment_id: &str) -> RemoteResult<ValueMap> {
        self.record(format!("get_capabilities:{deployment_id}"))?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .capabilities
            .get(deployment_id)
            .cloned()
            .unwrap_or_default())
    }
}
