use crate::auth::users::{DirectoryError, UserDirectory};
use crate::core::types::Password;
use crate::db::{CredentialStore, DbStore, StoreError};
use crate::util::clock::{Clock, SystemClock};
use crate::util::hash::HashingService;

use clap::Parser;

#[derive(Parser)]
#[clap(name = "scribe-util", version = env!("CARGO_PKG_VERSION"))]
pub struct Options {
    #[clap(env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,
    #[clap(env = "HASH_SECRET", hide_env_values = true)]
    hash_secret: String,
    #[clap(subcommand)]
    command: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    CreateUser(CreateUser),
    ListUsers(ListUsers),
    PurgeTokens(PurgeTokens),
    Migrate(Migrate),
}

#[derive(Parser)]
struct CreateUser {
    #[clap(short, long)]
    username: String,
    #[clap(short, long)]
    password: String,
}

#[derive(Parser)]
struct ListUsers;

/// Delete refresh tokens that are past their expiry
#[derive(Parser)]
struct PurgeTokens;

#[derive(Parser)]
struct Migrate;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

fn get_database(opts: &Options) -> Result<DbStore, StoreError> {
    let hasher = HashingService::with_secret_key(opts.hash_secret.to_string());
    DbStore::acquire(&opts.database_url, hasher)
}

async fn create_user(c: &CreateUser, db: &DbStore) -> Result<(), CliError> {
    let id = db
        .create_user(&c.username, &Password(c.password.to_string()))
        .await?;
    println!("{} (username: \"{}\")", id, c.username);
    Ok(())
}

fn list_users(_c: &ListUsers, db: &DbStore) -> Result<(), CliError> {
    for user in db.list_users()? {
        let kind = match user.password {
            Some(_) => "password",
            None => "third party",
        };
        println!("{} (username: \"{}\", {})", user.id, user.username, kind);
    }
    Ok(())
}

async fn purge_tokens(_c: &PurgeTokens, db: &DbStore) -> Result<(), CliError> {
    let removed = db.purge_expired(SystemClock.now()).await?;
    println!("Purged {} refresh tokens", removed);
    Ok(())
}

fn migrate(_c: &Migrate, db: &DbStore) -> Result<(), CliError> {
    db.migrate()?;
    Ok(())
}

pub async fn run_cli_action(opts: Options) -> Result<(), CliError> {
    let db = get_database(&opts)?;

    match &opts.command {
        SubCommand::CreateUser(c) => create_user(c, &db).await,
        SubCommand::ListUsers(c) => list_users(c, &db),
        SubCommand::PurgeTokens(c) => purge_tokens(c, &db).await,
        SubCommand::Migrate(c) => migrate(c, &db),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        let command = Options::command();
        command.clone().debug_assert();
        assert_eq!(command.get_author(), None);
    }

    #[test]
    fn subcommands_parse() {
        let opts = Options::try_parse_from([
            "scribe-util",
            "postgres://localhost/scribe",
            "pepper",
            "create-user",
            "--username",
            "carol",
            "--password",
            "secret",
        ])
        .unwrap();

        match opts.command {
            SubCommand::CreateUser(c) => {
                assert_eq!(c.username, "carol");
                assert_eq!(c.password, "secret");
            }
            _ => panic!("expected create-user"),
        }
    }
}
