mod support;

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use support::{FakeManager, cancelled_workflow, failing_workflow, map};
use tether_core::blueprint::{BlueprintSource, BlueprintUploadConfig};
use tether_core::commands::{
    CreateEnvironmentOptions, DeleteBlueprintOptions, DeleteEnvironmentOptions,
    ExecuteWorkflowOptions, OutputsToInputsOptions, UploadBlueprintOptions, UploadPluginOptions,
    create_environment, delete_blueprint, delete_environment, execute_workflow, outputs_to_inputs,
    upload_blueprint, upload_plugin,
};
use tether_core::config::parse_tether_toml_str;
use tether_core::document::{OutputsDocument, read_json};
use tether_core::environment::{EnvironmentDisposer, EnvironmentResult};
use tether_core::error::OrchestrationError;
use tether_core::execution::{ExecutionRunner, ImmediateTrigger, MemorySink};
use tether_core::inputs::InputSources;
use tether_core::remote::{ExecutionState, Package, ValueMap};

fn runner(manager: &FakeManager) -> ExecutionRunner<'_> {
    ExecutionRunner::new(manager)
        .with_trigger(Arc::new(ImmediateTrigger::new()))
        .with_sink(Arc::new(MemorySink::new()))
}

fn directory(dir: &str) -> BlueprintUploadConfig {
    BlueprintUploadConfig {
        root_directory: Some(dir.to_string()),
        ..BlueprintUploadConfig::default()
    }
}

#[test]
fn execute_workflow_waits_and_passes_parameters() {
    let manager = FakeManager::new().with_deployment("dep1", "bp1");
    let runner = runner(&manager);

    let record = execute_workflow(
        &runner,
        &ExecuteWorkflowOptions::new("dep1", "scale").with_parameters("{\"delta\": 2}"),
    )
    .unwrap();

    assert_eq!(record.state, ExecutionState::Succeeded);
    assert_eq!(manager.started()[0].2, map(json!({"delta": 2})));
}

#[test]
fn execute_workflow_without_waiting_returns_after_start() {
    let manager = FakeManager::new().with_deployment("dep1", "bp1");
    let runner = runner(&manager);

    let record = execute_workflow(
        &runner,
        &ExecuteWorkflowOptions::new("dep1", "scale")
            .with_wait(false)
            .with_print_logs(false),
    )
    .unwrap();

    assert_eq!(record.state, ExecutionState::Pending);
    assert!(manager.calls_matching("get_execution").is_empty());
}

#[test]
fn printing_logs_implies_waiting() {
    let manager = FakeManager::new().with_deployment("dep1", "bp1");
    let runner = runner(&manager);

    let record = execute_workflow(
        &runner,
        &ExecuteWorkflowOptions::new("dep1", "scale").with_wait(false),
    )
    .unwrap();

    assert!(record.succeeded());
}

#[test]
fn execute_workflow_fails_on_unsuccessful_end() {
    let manager = FakeManager::new()
        .with_deployment("dep1", "bp1")
        .with_workflow("heal", failing_workflow());
    let runner = runner(&manager);

    let err = execute_workflow(&runner, &ExecuteWorkflowOptions::new("dep1", "heal")).unwrap_err();

    match err {
        OrchestrationError::WorkflowExecutionFailed { message, .. } => {
            assert_eq!(message, "Execution did not end successfully")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn execute_workflow_fails_when_cancelled() {
    let manager = FakeManager::new()
        .with_deployment("dep1", "bp1")
        .with_workflow("heal", cancelled_workflow());
    let runner = runner(&manager);

    let err = execute_workflow(&runner, &ExecuteWorkflowOptions::new("dep1", "heal")).unwrap_err();

    match err {
        OrchestrationError::WorkflowExecutionFailed { message, record } => {
            assert_eq!(message, "Execution did not end successfully");
            assert_eq!(record.state, ExecutionState::Cancelled);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn execute_workflow_rejects_malformed_parameters() {
    let manager = FakeManager::new().with_deployment("dep1", "bp1");
    let runner = runner(&manager);

    let err = execute_workflow(
        &runner,
        &ExecuteWorkflowOptions::new("dep1", "scale").with_parameters("[1, 2"),
    )
    .unwrap_err();

    assert!(matches!(err, OrchestrationError::InvalidInputFormat { .. }));
    assert!(manager.started().is_empty());
}

#[test]
fn upload_blueprint_resolves_relative_paths_against_the_workspace() {
    let manager = FakeManager::new();

    let blueprint = upload_blueprint(
        &manager,
        &UploadBlueprintOptions::new("bp1", directory("app")).with_workspace("/work"),
    )
    .unwrap();

    assert_eq!(blueprint.id, "bp1");
    assert_eq!(
        manager.uploads()[0].1,
        BlueprintSource::LocalDirectory {
            path: PathBuf::from("/work/app"),
            main_file: "blueprint.yaml".to_string(),
        }
    );
}

#[test]
fn upload_blueprint_rejects_ambiguous_locations() {
    let manager = FakeManager::new();
    let location = BlueprintUploadConfig {
        archive_url: Some("https://example.com/bp.zip".to_string()),
        root_directory: Some("app".to_string()),
        ..BlueprintUploadConfig::default()
    };

    let err = upload_blueprint(&manager, &UploadBlueprintOptions::new("bp1", location)).unwrap_err();

    assert!(matches!(err, OrchestrationError::InvalidBlueprintSource { .. }));
    assert!(manager.calls().is_empty());
}

#[test]
fn delete_blueprint_reports_missing_blueprints() {
    let manager = FakeManager::new().with_blueprint("bp1");

    delete_blueprint(&manager, &DeleteBlueprintOptions::new("bp1")).unwrap();
    let err = delete_blueprint(&manager, &DeleteBlueprintOptions::new("bp1")).unwrap_err();

    assert!(matches!(
        err,
        OrchestrationError::Remote { ref source, .. } if source.is_not_found()
    ));
}

#[test]
fn create_then_delete_environment_round_trip() {
    let temp = TempDir::new().unwrap();
    let env_path = temp.path().join("env.json");
    let manager = FakeManager::new()
        .with_blueprint("bp1")
        .with_outputs("bp1", map(json!({"ip": "10.0.0.1"})), ValueMap::new());
    let runner = runner(&manager);

    let (result, plan) = create_environment(
        &runner,
        &CreateEnvironmentOptions::new("bp1")
            .with_inputs(InputSources::new().with_text("{\"size\": \"small\"}"))
            .with_env_data_path(&env_path),
    );
    let env = result.unwrap();

    // Deployment id defaults to the blueprint id.
    assert_eq!(env.deployment_id, "bp1");
    assert_eq!(plan.deployment_id(), Some("bp1"));
    let stored: EnvironmentResult = read_json(&env_path).unwrap();
    assert_eq!(stored, env);

    let report = delete_environment(&runner, &DeleteEnvironmentOptions::new(&env_path)).unwrap();

    assert!(report.uninstalled);
    assert!(report.deployment_deleted);
    assert!(!report.blueprint_deleted);
    assert!(manager.has_blueprint("bp1"));
}

#[test]
fn failed_create_environment_returns_a_plan_to_clean_up() {
    let manager = FakeManager::new().with_workflow("install", failing_workflow());
    let runner = runner(&manager);

    let (result, plan) = create_environment(
        &runner,
        &CreateEnvironmentOptions::new("bp1")
            .with_deployment_id("dep1")
            .with_location(directory("app")),
    );

    assert!(matches!(
        result,
        Err(OrchestrationError::EnvironmentCreationFailed { .. })
    ));
    assert_eq!(plan.deployment_id(), Some("dep1"));

    EnvironmentDisposer::new(&runner).dispose(plan).unwrap();
    assert!(manager.deployment("dep1").is_none());
    assert!(!manager.has_blueprint("bp1"));
}

#[test]
fn outputs_to_inputs_writes_mapped_inputs() {
    let temp = TempDir::new().unwrap();
    let outputs_path = temp.path().join("outputs.json");
    let inputs_path = temp.path().join("nested").join("inputs.json");
    OutputsDocument::new(
        map(json!({"ip": "10.0.0.1"})),
        map(json!({"port": 8080})),
    )
    .save(&outputs_path)
    .unwrap();

    let inputs = outputs_to_inputs(&OutputsToInputsOptions::new(
        &outputs_path,
        "outputs:\n  ip: host\ncapabilities:\n  port: port\n",
        &inputs_path,
    ))
    .unwrap();

    assert_eq!(inputs, map(json!({"host": "10.0.0.1", "port": 8080})));
    let written: ValueMap = read_json(&inputs_path).unwrap();
    assert_eq!(written, inputs);
}

#[test]
fn create_environment_applies_configuration() {
    let config = parse_tether_toml_str(
        "[execution]\npoll_interval_secs = 2\n\n[teardown]\nignore_failure = true\n\n[blueprint]\nrequired_packages = [\"plugin-x\"]\n",
    )
    .unwrap();
    let manager = FakeManager::new().with_packages(&["plugin-a"]);
    let runner = runner(&manager).with_settings(&config.execution);
    assert!(format!("{runner:?}").contains("2s"));

    let (result, plan) = create_environment(
        &runner,
        &CreateEnvironmentOptions::new("bp1")
            .with_location(directory("app"))
            .with_config(&config),
    );

    match result {
        Err(OrchestrationError::MissingPrerequisites { missing, .. }) => {
            assert_eq!(missing, vec!["plugin-x"])
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(plan.is_empty());
    assert!(plan.ignore_failure());
    assert!(manager.uploads().is_empty());
}

#[test]
fn upload_plugin_saves_package_details() {
    let temp = TempDir::new().unwrap();
    let manager = FakeManager::new();

    let package = upload_plugin(
        &manager,
        &UploadPluginOptions::new("dist/plugin-x.wgn", "dist/plugin.yaml")
            .with_workspace(temp.path())
            .with_output_path("out/plugin.json"),
    )
    .unwrap();

    assert_eq!(package.package_name, "plugin-x");
    assert_eq!(
        manager.package_uploads(),
        vec![(
            temp.path().join("dist/plugin-x.wgn"),
            temp.path().join("dist/plugin.yaml"),
        )]
    );
    let saved: Package = read_json(&temp.path().join("out/plugin.json")).unwrap();
    assert_eq!(saved, package);
}

#[test]
fn upload_plugin_without_output_path_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let manager = FakeManager::new();

    upload_plugin(
        &manager,
        &UploadPluginOptions::new("plugin-x.wgn", "plugin.yaml").with_workspace(temp.path()),
    )
    .unwrap();

    assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
}

#[test]
fn upload_plugin_requires_both_locations() {
    let manager = FakeManager::new();

    let err = upload_plugin(&manager, &UploadPluginOptions::new("plugin-x.wgn", "")).unwrap_err();

    assert!(matches!(err, OrchestrationError::InvalidInputFormat { .. }));
    assert!(manager.calls().is_empty());
}

#[test]
fn upload_plugin_failure_is_a_remote_error() {
    let manager = FakeManager::new().failing("upload_package:plugin-x.wgn");

    let err = upload_plugin(&manager, &UploadPluginOptions::new("plugin-x.wgn", "plugin.yaml"))
        .unwrap_err();

    assert!(matches!(err, OrchestrationError::Remote { .. }));
}

#[test]
fn uploaded_plugin_satisfies_blueprint_prerequisites() {
    let config = parse_tether_toml_str("[blueprint]\nrequired_packages = [\"plugin-x\"]\n").unwrap();
    let manager = FakeManager::new();
    let runner = runner(&manager);

    upload_plugin(&manager, &UploadPluginOptions::new("plugin-x.wgn", "plugin.yaml")).unwrap();
    let (result, plan) = create_environment(
        &runner,
        &CreateEnvironmentOptions::new("bp1")
            .with_location(directory("app"))
            .with_config(&config),
    );

    assert_eq!(result.unwrap().blueprint_id, "bp1");
    assert_eq!(manager.uploads().len(), 1);
    EnvironmentDisposer::new(&runner).dispose(plan).unwrap();
}
