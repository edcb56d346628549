//! Credential management for EasyAPI JSON credential files.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use easyapi_security::{Authenticator, Credential, DEFAULT_ID_LEN};

#[derive(Parser)]
#[command(name = "easyapi-keygen", about = "Manage EasyAPI credential files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a credential and print the id/key pair.
    Create {
        /// Credential file to update (created if missing).
        #[arg(long, default_value = "credentials.json")]
        file: PathBuf,
        /// Algorithm ids the credential may use; `*` grants all.
        #[arg(long, value_delimiter = ',', default_value = "*")]
        access: Vec<String>,
        /// Length of the generated access id.
        #[arg(long, default_value_t = DEFAULT_ID_LEN)]
        id_len: usize,
    },
    /// List credential ids and their access sets.
    List {
        #[arg(long, default_value = "credentials.json")]
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli.command) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Create {
            file,
            access,
            id_len,
        } => {
            if !file.exists() {
                std::fs::write(&file, "{}")?;
            }
            let auth = Authenticator::from_file(file)?;
            let (id, key) = auth.create(id_len, access)?;
            println!("id:  {id}");
            println!("key: {key}");
        }
        Command::List { file } => {
            let text = std::fs::read_to_string(&file)?;
            let credentials: std::collections::BTreeMap<String, Credential> =
                serde_json::from_str(&text)?;
            for (id, credential) in credentials {
                println!("{id}  access: {}", credential.access.join(","));
            }
        }
    }
    Ok(())
}
