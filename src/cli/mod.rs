use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use duration_string::DurationString;
use serde_json::{json, Value as JsonValue};

use crate::utils::{load_tasks, Config, Task};
use crate::zabbix::{DeclaredState, ObjectType};

#[derive(Parser)]
#[command(name = "zbx-config")]
#[command(about = "Declarative Zabbix configuration", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// YAML file with url, user, password and timeout
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "ZABBIX_URL")]
    pub url: Option<String>,

    #[arg(long, global = true, env = "ZABBIX_USER")]
    pub user: Option<String>,

    #[arg(long, global = true, env = "ZABBIX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Request timeout, e.g. "30s"
    #[arg(long, global = true)]
    pub timeout: Option<DurationString>,

    /// Report what would change without changing anything
    #[arg(long, global = true)]
    pub check: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every task of a YAML task file
    Apply {
        file: PathBuf,
    },
    /// Reconcile a single object
    Object {
        #[arg(long = "type")]
        object_type: ObjectType,

        /// Desired fields as a JSON object
        #[arg(long)]
        fields: String,

        #[arg(long, value_enum, default_value = "present")]
        state: StateArg,

        /// Template the object belongs to
        #[arg(long)]
        template: Option<String>,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StateArg {
    Present,
    Absent,
}

impl From<StateArg> for DeclaredState {
    fn from(state: StateArg) -> Self {
        match state {
            StateArg::Present => DeclaredState::Present,
            StateArg::Absent => DeclaredState::Absent,
        }
    }
}

impl Cli {
    /// Connection settings: flags and environment over the config file.
    pub fn config(&self) -> Result<Config> {
        let file = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        Ok(file.merge(Config {
            url: self.url.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            timeout: self.timeout.clone(),
        }))
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        match &self.command {
            Commands::Apply { file } => load_tasks(file),
            Commands::Object {
                object_type,
                fields,
                state,
                template,
            } => {
                let fields: JsonValue =
                    serde_json::from_str(fields).context("--fields must be a JSON object")?;
                let state = DeclaredState::from(*state);

                Ok(vec![Task::new(
                    &format!("{} object", object_type),
                    "zabbix_object",
                    json!({
                        "objectType": object_type,
                        "fields": fields,
                        "declaredState": state,
                        "template": template,
                    }),
                )])
            }
        }
    }
}
