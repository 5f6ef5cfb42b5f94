//! Command line argument parsing
//!
//! Every lifecycle operation is a subcommand. Operations run as the user
//! given with `--user`; `list-user` and `show-config` need no caller.

use crate::lifecycle::{CreateRequest, TerminalRequest};
use crate::record::PageRequest;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "paasctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operate containers on the PaaS control plane")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Caller identity
    #[arg(short = 'u', long = "user", global = true)]
    pub user: Option<String>,

    /// Run against an in-memory runtime and store
    #[arg(short = 'n', long = "dry-run", global = true)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a container in a project
    Create(CreateArgs),
    /// Start a container in the background
    Start { container_id: String },
    /// Pause a running container
    Pause { container_id: String },
    /// Resume a paused container
    Continue { container_id: String },
    /// Stop a running or paused container
    Stop { container_id: String },
    /// Kill a container
    Kill { container_id: String },
    /// Restart a container
    Restart { container_id: String },
    /// List processes of a running container
    Top { container_id: String },
    /// Remove a stopped container and its record
    Remove { container_id: String },
    /// Show one container
    Get { container_id: String },
    /// Check whether the caller may operate on a container
    Check { container_id: String },
    /// List the caller's containers in projects it owns (all for admins)
    List(PageArgs),
    /// List containers of a project
    ListProject {
        project_id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// List containers owned by a user within their projects, or every container
    ListUser {
        /// Owner to filter on; every container when omitted
        owner: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Build an exec terminal descriptor for a running container
    Terminal(TerminalArgs),
    /// Reconcile records with the runtime
    Sync,
    /// List result codes and lifecycle statuses
    Enums,
    /// Show configuration discovery information
    ShowConfig,
    /// Write a default user configuration file
    InitConfig,
}

#[derive(Debug, ClapArgs)]
pub struct CreateArgs {
    /// Owning project
    #[arg(short = 'p', long = "project")]
    pub project_id: String,
    /// Container name
    #[arg(long = "name")]
    pub name: String,
    /// Image name or ID
    #[arg(short = 'i', long = "image")]
    pub image_id: String,
    /// Extra port mapping CONTAINER_PORT=HOST_PORT (repeatable)
    #[arg(long = "port", value_name = "PORT=HOST", value_parser = parse_port_mapping)]
    pub ports: Vec<(String, u16)>,
    /// Environment entry KEY=VALUE (repeatable)
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
    pub env: Vec<String>,
    /// Container path that receives an anonymous volume (repeatable)
    #[arg(long = "volume", value_name = "PATH")]
    pub destinations: Vec<String>,
    /// Command to run instead of the image default
    #[arg(last = true)]
    pub cmd: Vec<String>,
}

impl CreateArgs {
    pub fn into_request(self) -> CreateRequest {
        CreateRequest {
            project_id: self.project_id,
            name: self.name,
            image_id: self.image_id,
            cmd: self.cmd,
            port_map: self.ports.into_iter().collect(),
            env: self.env,
            destinations: self.destinations,
        }
    }
}

#[derive(Debug, Clone, Copy, ClapArgs)]
pub struct PageArgs {
    /// Page number, starting at 1
    #[arg(long = "page", default_value_t = 1)]
    pub page: u32,
    /// Records per page
    #[arg(long = "size", default_value_t = 10)]
    pub size: u32,
}

impl From<PageArgs> for PageRequest {
    fn from(args: PageArgs) -> Self {
        PageRequest::new(args.page, args.size)
    }
}

#[derive(Debug, ClapArgs)]
pub struct TerminalArgs {
    pub container_id: String,
    #[arg(long = "cursor-blink")]
    pub cursor_blink: bool,
    #[arg(long = "cols", default_value_t = 100)]
    pub cols: u32,
    #[arg(long = "rows", default_value_t = 50)]
    pub rows: u32,
    #[arg(long = "width", default_value_t = 100)]
    pub width: u32,
    #[arg(long = "height", default_value_t = 50)]
    pub height: u32,
}

impl From<TerminalArgs> for TerminalRequest {
    fn from(args: TerminalArgs) -> Self {
        TerminalRequest {
            container_id: args.container_id,
            cursor_blink: args.cursor_blink,
            cols: args.cols,
            rows: args.rows,
            width: args.width,
            height: args.height,
        }
    }
}

fn parse_port_mapping(value: &str) -> Result<(String, u16), String> {
    let (container_port, host_port) = value
        .split_once('=')
        .ok_or_else(|| format!("'{}' is not CONTAINER_PORT=HOST_PORT", value))?;
    if container_port.trim().is_empty() {
        return Err(format!("'{}' has an empty container port", value));
    }
    let host_port = host_port
        .trim()
        .parse::<u16>()
        .map_err(|e| format!("invalid host port in '{}': {}", value, e))?;
    Ok((container_port.trim().to_string(), host_port))
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }
}
