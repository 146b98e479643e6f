use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uporch_core::ClientConfig;

mod commands;

fn project_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("project")
            .long("project")
            .required(true)
            .help("Project identifier"),
    )
    .arg(
        Arg::new("project-version")
            .long("project-version")
            .default_value("v1")
            .value_parser(["v1", "v2"])
            .help("Version the project currently has"),
    )
    .arg(
        Arg::new("role")
            .long("role")
            .default_value("admin")
            .help("Role of the current user in the project"),
    )
    .arg(
        Arg::new("key-dir")
            .long("key-dir")
            .value_parser(value_parser!(PathBuf))
            .help("Read the private key from this directory instead of the environment"),
    )
}

fn workspace_arg() -> Arg {
    Arg::new("workspace")
        .long("workspace")
        .required(true)
        .help("Workspace the policy belongs to")
}

fn policy_field_args(cmd: Command, required: bool) -> Command {
    cmd.arg(
        Arg::new("approvals")
            .long("approvals")
            .required(required)
            .value_parser(value_parser!(u32))
            .help("Number of approvals required"),
    )
    .arg(
        Arg::new("approver")
            .long("approver")
            .action(ArgAction::Append)
            .required(required)
            .help("Approver user id (repeatable)"),
    )
    .arg(
        Arg::new("secret-path")
            .long("secret-path")
            .help("Secret path the policy applies to"),
    )
    .arg(Arg::new("name").long("name").help("Policy name"))
}

fn build_cli() -> Command {
    Command::new("uporch")
        .version(uporch_core::VERSION)
        .about("Project upgrade orchestrator")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("status")
                .about("Print the upgrade job status of a project")
                .arg(
                    Arg::new("project")
                        .long("project")
                        .required(true)
                        .help("Project identifier"),
                ),
        )
        .subcommand(project_args(
            Command::new("watch").about("Poll the upgrade status until the job completes"),
        ))
        .subcommand(project_args(
            Command::new("upgrade").about("Submit the upgrade, then watch it"),
        ))
        .subcommand(
            Command::new("policy")
                .about("Manage secret approval policies")
                .subcommand_required(true)
                .subcommand(policy_field_args(
                    Command::new("create")
                        .about("Create a policy")
                        .arg(workspace_arg())
                        .arg(
                            Arg::new("environment")
                                .long("environment")
                                .required(true)
                                .help("Environment slug"),
                        ),
                    true,
                ))
                .subcommand(policy_field_args(
                    Command::new("update")
                        .about("Update a policy")
                        .arg(Arg::new("id").long("id").required(true).help("Policy id"))
                        .arg(workspace_arg()),
                    false,
                ))
                .subcommand(
                    Command::new("delete")
                        .about("Delete a policy")
                        .arg(Arg::new("id").long("id").required(true).help("Policy id"))
                        .arg(workspace_arg()),
                )
                .subcommand(
                    Command::new("list")
                        .about("List the policies of a workspace")
                        .arg(workspace_arg()),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ClientConfig> {
    let path = matches.get_one::<PathBuf>("config");
    ClientConfig::load(path.map(PathBuf::as_path)).context("failed to load configuration")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));

    let config = load_config(&matches)?;
    tracing::debug!(api_url = %config.api_url, "configuration loaded");

    match matches.subcommand() {
        Some(("status", args)) => commands::status(&config, args).await,
        Some(("watch", args)) => commands::watch(&config, args, false).await,
        Some(("upgrade", args)) => commands::watch(&config, args, true).await,
        Some(("policy", args)) => commands::policy(&config, args).await,
        other => anyhow::bail!("unknown command: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn watch_defaults_to_legacy_admin() {
        let matches = build_cli()
            .try_get_matches_from(["uporch", "watch", "--project", "p1"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "watch");
        assert_eq!(args.get_one::<String>("project-version").unwrap(), "v1");
        assert_eq!(args.get_one::<String>("role").unwrap(), "admin");
    }

    #[test]
    fn global_flags_after_subcommand() {
        let matches = build_cli()
            .try_get_matches_from(["uporch", "status", "--project", "p1", "--json-logs"])
            .unwrap();
        assert!(matches.get_flag("json-logs"));
    }

    #[test]
    fn policy_create_requires_approvers() {
        let result = build_cli().try_get_matches_from([
            "uporch",
            "policy",
            "create",
            "--workspace",
            "ws",
            "--environment",
            "prod",
            "--approvals",
            "1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn policy_update_collects_repeated_approvers() {
        let matches = build_cli()
            .try_get_matches_from([
                "uporch", "policy", "update", "--id", "pol-1", "--workspace", "ws",
                "--approver", "u1", "--approver", "u2",
            ])
            .unwrap();
        let (_, policy) = matches.subcommand().unwrap();
        let (_, update) = policy.subcommand().unwrap();
        let approvers: Vec<&String> = update.get_many::<String>("approver").unwrap().collect();
        assert_eq!(approvers, ["u1", "u2"]);
    }
}
