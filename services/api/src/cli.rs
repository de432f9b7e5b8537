use crate::jobs::{
    run_officer_import, run_region_flags, run_reset_admin, run_status_reconciliation, FileArgs,
    ResetAdminArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use groundcheck::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "groundcheck",
    about = "Serve the field verification API and run maintenance jobs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Apply bulk updates from a CSV file (maintenance window only)
    Reconcile {
        #[command(subcommand)]
        command: ReconcileCommand,
    },
    /// Manage officer accounts
    Officers {
        #[command(subcommand)]
        command: OfficersCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ReconcileCommand {
    /// Mark records verified by the system from (idsbr, status, lat, lng) rows
    Status(FileArgs),
    /// Set the allow-new flag per region from (code, flag) rows
    Regions(FileArgs),
}

#[derive(Subcommand, Debug)]
enum OfficersCommand {
    /// Create officer accounts from (name, email, password) rows
    Import(FileArgs),
    /// Replace the account for an e-mail with an administrator account
    ResetAdmin(ResetAdminArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Provision an administrator at startup (useful with the in-memory store)
    #[arg(long, requires = "admin_password")]
    pub(crate) admin_email: Option<String>,
    /// Password for --admin-email
    #[arg(long, requires = "admin_email")]
    pub(crate) admin_password: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Reconcile {
            command: ReconcileCommand::Status(args),
        } => run_status_reconciliation(args).await,
        Command::Reconcile {
            command: ReconcileCommand::Regions(args),
        } => run_region_flags(args).await,
        Command::Officers {
            command: OfficersCommand::Import(args),
        } => run_officer_import(args).await,
        Command::Officers {
            command: OfficersCommand::ResetAdmin(args),
        } => run_reset_admin(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_arguments_means_serve() {
        let cli = Cli::try_parse_from(["groundcheck"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_job_subcommands() {
        let cli = Cli::try_parse_from(["groundcheck", "reconcile", "status", "--file", "rows.csv"])
            .expect("parses");
        assert!(matches!(
            cli.command,
            Some(Command::Reconcile {
                command: ReconcileCommand::Status(FileArgs { ref file })
            }) if file.to_str() == Some("rows.csv")
        ));

        let cli = Cli::try_parse_from([
            "groundcheck",
            "officers",
            "reset-admin",
            "--email",
            "admin@desa.id",
            "--password",
            "rahasia",
        ])
        .expect("parses");
        assert!(matches!(
            cli.command,
            Some(Command::Officers {
                command: OfficersCommand::ResetAdmin(_)
            })
        ));
    }

    #[test]
    fn admin_bootstrap_needs_both_flags() {
        assert!(Cli::try_parse_from(["groundcheck", "serve", "--admin-email", "a@desa.id"]).is_err());
    }
}
