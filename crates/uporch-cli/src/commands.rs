//! Subcommand handlers

use anyhow::Context;
use clap::ArgMatches;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use uporch_approvals::{
    ApprovalPolicyService, CreatePolicyRequest, DeletePolicyRequest, PolicyCache,
    UpdatePolicyRequest, WorkspaceId,
};
use uporch_core::{
    ClientConfig, ControllerDeps, ControllerSnapshot, CredentialProvider, EnvCredentials,
    FileCredentials, FnRefresher, GateContext, GateDecision, PollingController, Project,
    ProjectId, ProjectVersion, Role, TracingNotifier, UpgradeApi, UpgradeGate,
};
use uporch_http::HttpClient;

fn client(config: &ClientConfig) -> anyhow::Result<Arc<HttpClient>> {
    let client = HttpClient::new(config).context("failed to build HTTP client")?;
    Ok(Arc::new(client))
}

fn required<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing --{name}"))
}

fn optional(args: &ArgMatches, name: &str) -> Option<String> {
    args.get_one::<String>(name).cloned()
}

fn approvers(args: &ArgMatches) -> Option<Vec<String>> {
    args.get_many::<String>("approver")
        .map(|values| values.cloned().collect())
}

fn print_snapshot(snapshot: &ControllerSnapshot) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string(snapshot)?);
    Ok(())
}

/// `status`: one query, printed as JSON
pub(crate) async fn status(config: &ClientConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let project_id = ProjectId::new(required(args, "project")?);
    let response = client(config)?
        .upgrade_status(&project_id)
        .await
        .with_context(|| format!("status query for {project_id} failed"))?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// `watch` and `upgrade`: mount a controller and print every snapshot
///
/// Returns once the session refresh is requested or on Ctrl-C.
pub(crate) async fn watch(
    config: &ClientConfig,
    args: &ArgMatches,
    submit: bool,
) -> anyhow::Result<()> {
    let version: ProjectVersion = required(args, "project-version")?
        .parse()
        .map_err(anyhow::Error::msg)?;
    let project = Project::new(required(args, "project")?, version);
    let role: Role = required(args, "role")?.parse().map_err(anyhow::Error::msg)?;

    let gate = UpgradeGate::new(config.features);
    if let GateDecision::Hidden(reason) = gate.evaluate(&GateContext::new(project.clone(), role.clone())) {
        tracing::warn!(?reason, project_id = %project.id, "upgrade not available");
        if submit {
            anyhow::bail!("upgrade not available for {}: {reason:?}", project.id);
        }
        return Ok(());
    }

    let credentials: Arc<dyn CredentialProvider> = match args.get_one::<PathBuf>("key-dir") {
        Some(dir) => Arc::new(FileCredentials::new(dir.clone(), config.credential_key.clone())),
        None => Arc::new(EnvCredentials::new(config.credential_key.clone())),
    };
    let refreshed = Arc::new(Notify::new());
    let signal = Arc::clone(&refreshed);
    let deps = ControllerDeps {
        api: client(config)?,
        credentials,
        notifier: Arc::new(TracingNotifier),
        refresher: Arc::new(FnRefresher::new(move || signal.notify_one())),
    };

    let controller = PollingController::new(gate, project, role, deps);
    let mut snapshots = controller.subscribe();
    controller.mount();

    if submit {
        controller.submit_upgrade().await.context("upgrade failed")?;
    }

    print_snapshot(&snapshots.borrow_and_update())?;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_snapshot(&snapshot)?;
            }
            () = refreshed.notified() => {
                println!("upgrade complete; reload the project");
                break;
            }
            result = &mut ctrl_c => {
                result.context("failed to listen for Ctrl-C")?;
                tracing::info!("interrupted");
                break;
            }
        }
    }

    controller.unmount();
    Ok(())
}

fn create_request(args: &ArgMatches) -> anyhow::Result<CreatePolicyRequest> {
    Ok(CreatePolicyRequest {
        environment: required(args, "environment")?.to_string(),
        workspace_id: WorkspaceId::new(required(args, "workspace")?),
        approvals: *args
            .get_one::<u32>("approvals")
            .context("missing --approvals")?,
        approver_user_ids: approvers(args).unwrap_or_default(),
        secret_path: optional(args, "secret-path"),
        name: optional(args, "name"),
    })
}

fn update_request(args: &ArgMatches) -> anyhow::Result<UpdatePolicyRequest> {
    let mut request = UpdatePolicyRequest::new(required(args, "id")?, required(args, "workspace")?);
    if let Some(approvals) = args.get_one::<u32>("approvals") {
        request = request.with_approvals(*approvals);
    }
    if let Some(approvers) = approvers(args) {
        request = request.with_approvers(approvers);
    }
    if let Some(path) = optional(args, "secret-path") {
        request = request.with_secret_path(path);
    }
    if let Some(name) = optional(args, "name") {
        request = request.with_name(name);
    }
    Ok(request)
}

/// `policy create|update|delete|list`
pub(crate) async fn policy(config: &ClientConfig, args: &ArgMatches) -> anyhow::Result<()> {
    let service = ApprovalPolicyService::new(client(config)?, PolicyCache::default());

    let payload = match args.subcommand() {
        Some(("create", sub)) => service.create(create_request(sub)?).await?,
        Some(("update", sub)) => service.update(update_request(sub)?).await?,
        Some(("delete", sub)) => {
            service
                .delete(DeletePolicyRequest::new(required(sub, "id")?, required(sub, "workspace")?))
                .await?
        }
        Some(("list", sub)) => {
            let workspace_id = WorkspaceId::new(required(sub, "workspace")?);
            let policies = service.list(&workspace_id).await?;
            serde_json::to_value(&*policies)?
        }
        other => anyhow::bail!("unknown policy command: {other:?}"),
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
