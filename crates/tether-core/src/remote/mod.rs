//! Remote orchestration manager interface.
//!
//! The core never talks HTTP itself. Everything it needs from the manager goes
//! through [`ManagerClient`], a small synchronous interface implemented by the
//! transport layer (or by an in-memory fake in tests).

pub mod model;

use std::collections::BTreeSet;
use std::path::Path;

pub use model::{
    Blueprint, Deployment, EventLevel, Execution, ExecutionEvent, ExecutionState, Package,
    ValueMap,
};

use crate::blueprint::BlueprintSource;
use crate::error::RemoteError;

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Synchronous client for the remote manager's environment lifecycle API.
pub trait ManagerClient: Send + Sync {
    fn get_blueprint(&self, id: &str) -> RemoteResult<Blueprint>;

    fn upload_blueprint(&self, id: &str, source: &BlueprintSource) -> RemoteResult<Blueprint>;

    fn delete_blueprint(&self, id: &str) -> RemoteResult<()>;

    /// Names of the packages (plugins) currently installed on the manager.
    fn list_installed_packages(&self) -> RemoteResult<BTreeSet<String>>;

    /// Upload a plugin package: the wagon archive plus its plugin YAML.
    fn upload_package(&self, wagon: &Path, yaml: &Path) -> RemoteResult<Package>;

    fn create_deployment(
        &self,
        blueprint_id: &str,
        id: &str,
        inputs: &ValueMap,
    ) -> RemoteResult<Deployment>;

    fn delete_deployment(&self, id: &str) -> RemoteResult<()>;

    fn start_execution(
        &self,
        deployment_id: &str,
        workflow_id: &str,
        parameters: &ValueMap,
    ) -> RemoteResult<Execution>;

    fn get_execution(&self, id: &str) -> RemoteResult<Execution>;

    /// Events recorded for an execution with a cursor strictly greater than
    /// `after` (all events when `after` is `None`), in the order the manager
    /// recorded them.
    fn list_execution_events(
        &self,
        execution_id: &str,
        after: Option<u64>,
    ) -> RemoteResult<Vec<ExecutionEvent>>;

    fn get_outputs(&self, deployment_id: &str) -> RemoteResult<ValueMap>;

    fn get_capabilities(&self, deployment_id: &str) -> RemoteResult<ValueMap>;
}
