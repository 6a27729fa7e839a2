use clap::{Args, Parser, Subcommand};

use crate::shared::SortOrder;

#[derive(Parser, Debug)]
#[command(name = "aza", bin_name = "aza", version)]
#[command(about = "Azure AI Agents CLI for Foundry Agent Service (v2 and classic v1)")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Base endpoint containing the project
    #[arg(long, short = 'p', global = true, env = "AZA_PROJECT")]
    pub project: Option<String>,

    /// Override the API version sent with every request
    #[arg(long, global = true, env = "AZA_API_VERSION")]
    pub api_version: Option<String>,

    /// Bearer token; defaults to `az account get-access-token`
    #[arg(long, global = true, env = "AZA_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output prettified JSON (`*_at` timestamps converted)
    #[arg(long, global = true, conflicts_with = "raw")]
    pub json: bool,

    /// Output the API payload as received
    #[arg(long, global = true)]
    pub raw: bool,

    /// Verbose HTTP debug output
    #[arg(long, global = true, env = "AZA_DEBUG")]
    pub debug: bool,

    /// Use the classic (v1) agents surface
    #[arg(long = "v1", global = true)]
    pub legacy: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List or show agents (assistants with --v1)
    Agents {
        #[command(subcommand)]
        action: AgentsAction,
    },
    /// List, show, search or delete responses
    #[command(visible_alias = "resp")]
    Responses {
        #[command(subcommand)]
        action: ResponsesAction,
    },
    /// List, show, search or delete conversations
    #[command(visible_alias = "conv")]
    Conversations {
        #[command(subcommand)]
        action: ConversationsAction,
    },
    /// Classic threads and their runs
    Threads {
        #[command(subcommand)]
        action: ThreadsAction,
    },
    /// Classic runs of a thread
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },
    /// Uploaded files
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },
    /// Vector stores and their files
    #[command(name = "vs", visible_alias = "vectorstores")]
    VectorStores {
        #[command(subcommand)]
        action: VectorStoresAction,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Page size
    #[arg(long)]
    pub limit: Option<u32>,

    /// Sort order
    #[arg(long, value_enum)]
    pub order: Option<SortOrder>,

    /// Return items after this id
    #[arg(long)]
    pub after: Option<String>,

    /// Return items before this id
    #[arg(long)]
    pub before: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Substring to look for in ids (case-insensitive)
    pub query: String,

    /// Stop after this many matches (1-1000)
    #[arg(long, default_value_t = 200)]
    pub max_results: usize,

    /// Stop after examining this many records (1-50000)
    #[arg(long, default_value_t = 5000)]
    pub scan_limit: usize,

    /// Records requested per page (1-200)
    #[arg(long, default_value_t = 100)]
    pub limit: u32,

    #[arg(long, value_enum)]
    pub order: Option<SortOrder>,
}

#[derive(Subcommand, Debug)]
pub enum AgentsAction {
    List(PageArgs),
    Show { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ResponsesAction {
    List(PageArgs),
    Show { id: String },
    /// Scan pages of responses for ids containing a substring
    Search(SearchArgs),
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ConversationsAction {
    List(PageArgs),
    /// Show a conversation and its items
    Show { id: String },
    /// Scan pages of conversations for ids containing a substring
    Search(SearchArgs),
    Delete { id: String },
}

#[derive(Subcommand, Debug)]
pub enum ThreadsAction {
    List(PageArgs),
    /// Show a thread as a transcript of its messages
    Show(ThreadShowArgs),
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ThreadShowArgs {
    pub id: String,

    #[command(flatten)]
    pub page: PageArgs,

    /// Only messages produced by this run
    #[arg(long)]
    pub run_id: Option<String>,

    /// Include message ids in headers
    #[arg(long)]
    pub show_ids: bool,

    /// List every citation under its message
    #[arg(long)]
    pub show_citations: bool,

    /// Truncate message bodies to this many characters
    #[arg(long)]
    pub max_body: Option<usize>,

    /// Do not soft-wrap message bodies
    #[arg(long)]
    pub no_wrap: bool,
}

#[derive(Subcommand, Debug)]
pub enum RunsAction {
    List {
        thread_id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    Show { thread_id: String, run_id: String },
}

#[derive(Subcommand, Debug)]
pub enum FilesAction {
    List(PageArgs),
    Show { id: String },
}

#[derive(Subcommand, Debug)]
pub enum VectorStoresAction {
    List(PageArgs),
    Show { id: String },
    Files {
        #[command(subcommand)]
        action: VectorStoreFilesAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum VectorStoreFilesAction {
    List {
        vector_store_id: String,
        #[command(flatten)]
        page: PageArgs,
    },
    Show {
        vector_store_id: String,
        file_id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn aliases_and_global_flags_parse() {
        let cli = Cli::try_parse_from([
            "aza", "conv", "search", "abc", "--max-results", "2", "-p", "https://x/api/projects/p", "--json",
        ])
        .unwrap();
        assert!(cli.global.json);
        assert_eq!(cli.global.project.as_deref(), Some("https://x/api/projects/p"));
        match cli.command {
            Command::Conversations {
                action: ConversationsAction::Search(args),
            } => {
                assert_eq!(args.query, "abc");
                assert_eq!(args.max_results, 2);
                assert_eq!(args.scan_limit, 5000);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn nested_vector_store_files_parse() {
        let cli = Cli::try_parse_from(["aza", "vectorstores", "files", "show", "vs_1", "file_2"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::VectorStores {
                action: VectorStoresAction::Files {
                    action: VectorStoreFilesAction::Show { .. }
                }
            }
        ));
    }

    #[test]
    fn json_and_raw_conflict() {
        assert!(Cli::try_parse_from(["aza", "files", "list", "--json", "--raw"]).is_err());
    }
}
