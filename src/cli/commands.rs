use serde_json::json;
use tracing::warn;

use crate::args::{
    AgentsAction, Cli, Command, ConversationsAction, FilesAction, PageArgs, ResponsesAction,
    RunsAction, SearchArgs, ThreadShowArgs, ThreadsAction, VectorStoreFilesAction,
    VectorStoresAction,
};
use crate::format::{
    col, render_list, render_search, render_transcript, stringify, Column, OutputMode,
    TranscriptOptions,
};
use crate::shared::payload::into_records;
use crate::shared::retry::RetryPolicy;
use crate::shared::search::{search, ListingSource, SearchQuery};
use crate::shared::{
    AgentsClient, ApiSurface, AzaError, ClientConfig, Credential, ListParams, Resource, Result,
    SortOrder,
};

const AGENT_COLUMNS: &[Column] = &[
    col("ID", "id"),
    col("Name", "name"),
    col("Model", "model"),
    col("Created", "created_at"),
];
const RESPONSE_COLUMNS: &[Column] = &[
    col("ID", "id"),
    col("Status", "status"),
    col("Model", "model"),
    col("Created", "created_at"),
];
const CONVERSATION_COLUMNS: &[Column] = &[col("ID", "id"), col("Created", "created_at")];
const ITEM_COLUMNS: &[Column] = &[
    col("ID", "id"),
    col("Type", "type"),
    col("Role", "role"),
    col("Status", "status"),
];
const THREAD_COLUMNS: &[Column] = &[col("ID", "id"), col("Created", "created_at")];
const RUN_COLUMNS: &[Column] = &[
    col("ID", "id"),
    col("Status", "status"),
    col("Assistant", "assistant_id"),
    col("Created", "created_at"),
];
const FILE_COLUMNS: &[Column] = &[
    col("ID", "id"),
    col("Filename", "filename"),
    col("Bytes", "bytes"),
    col("Purpose", "purpose"),
    col("Created", "created_at"),
];
const VECTOR_STORE_COLUMNS: &[Column] = &[
    col("ID", "id"),
    col("Name", "name"),
    col("Status", "status"),
    col("Files", "file_counts.completed"),
    col("Created", "created_at"),
];
const VECTOR_STORE_FILE_COLUMNS: &[Column] = &[
    col("ID", "id"),
    col("Status", "status"),
    col("Created", "created_at"),
];

const TRANSCRIPT_PAGE_SIZE: u32 = 100;
const JSON_SEPARATOR: &str = "\n\n---\n\n";

/// Everything a command handler needs besides its own arguments.
struct Context {
    client: AgentsClient,
    mode: OutputMode,
    legacy: bool,
}

impl Context {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let global = &cli.global;
        let project = global
            .project
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AzaError::usage("Set AZA_PROJECT or pass --project <endpoint>"))?;

        let config = ClientConfig::new(project)
            .with_api_version(global.api_version.clone())
            .with_debug(global.debug);
        let credential = Credential::from_token(global.token.clone());
        let client = AgentsClient::new(AgentsClient::build_http()?, &config, credential)?;

        Ok(Self {
            client,
            mode: OutputMode::from_flags(global.json, global.raw),
            legacy: global.legacy,
        })
    }

    async fn list(&self, resource: Resource, path: &str, page: &PageArgs, columns: &[Column]) -> Result<()> {
        let payload = self
            .client
            .get(resource.surface(), path, &list_params(page).to_query())
            .await?;
        let records = into_records(payload.clone(), resource.list_key());
        println!("{}", render_list(&payload, &records, columns, self.mode));
        Ok(())
    }

    async fn show(&self, surface: ApiSurface, path: &str) -> Result<()> {
        let payload = self.client.get(surface, path, &[]).await?;
        println!("{}", stringify(&payload, self.mode));
        Ok(())
    }

    async fn search(&self, resource: Resource, args: &SearchArgs, columns: &[Column]) -> Result<()> {
        let source = ListingSource::new(self.client.clone(), resource)?;
        let query = SearchQuery::new(args.query.clone())
            .with_max_results(args.max_results)
            .with_scan_limit(args.scan_limit)
            .with_page_size(args.limit)
            .with_order(args.order);
        let outcome = search(&source, &query, &RetryPolicy::default()).await?;
        println!("{}", render_search(&outcome, columns, self.mode));
        Ok(())
    }

    async fn delete(&self, resource: Resource, id: &str) -> Result<()> {
        let path = item_path(resource, id)?;
        let payload = self.client.delete(resource.surface(), &path).await?;
        let shown = if payload.is_null() {
            json!({"deleted": true, "id": id})
        } else {
            payload
        };
        println!("{}", stringify(&shown, self.mode));
        Ok(())
    }

    fn agents_resource(&self) -> Resource {
        if self.legacy {
            Resource::Assistants
        } else {
            Resource::Agents
        }
    }
}

fn list_params(page: &PageArgs) -> ListParams {
    ListParams {
        limit: page.limit,
        order: page.order,
        after: page.after.clone(),
        before: page.before.clone(),
    }
}

fn require_id<'a>(id: &'a str, what: &str) -> Result<&'a str> {
    let id = id.trim();
    if id.is_empty() {
        return Err(AzaError::usage(format!("Missing {what}")));
    }
    Ok(id)
}

fn item_path(resource: Resource, id: &str) -> Result<String> {
    resource
        .item_path(require_id(id, "id")?)
        .ok_or_else(|| AzaError::usage(format!("{resource:?} needs a parent id")))
}

fn collection(resource: Resource) -> &'static str {
    resource.collection().unwrap_or_default()
}

fn encode(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let ctx = Context::from_cli(&cli)?;

    match cli.command {
        Command::Agents { action } => agents(&ctx, action).await,
        Command::Responses { action } => responses(&ctx, action).await,
        Command::Conversations { action } => conversations(&ctx, action).await,
        Command::Threads { action } => threads(&ctx, action).await,
        Command::Runs { action } => runs(&ctx, action).await,
        Command::Files { action } => files(&ctx, action).await,
        Command::VectorStores { action } => vector_stores(&ctx, action).await,
    }
}

async fn agents(ctx: &Context, action: AgentsAction) -> Result<()> {
    let resource = ctx.agents_resource();
    match action {
        AgentsAction::List(page) => {
            ctx.list(resource, collection(resource), &page, AGENT_COLUMNS)
                .await
        }
        AgentsAction::Show { id } => {
            ctx.show(resource.surface(), &item_path(resource, &id)?)
                .await
        }
    }
}

async fn responses(ctx: &Context, action: ResponsesAction) -> Result<()> {
    let resource = Resource::Responses;
    match action {
        ResponsesAction::List(page) => {
            ctx.list(resource, collection(resource), &page, RESPONSE_COLUMNS)
                .await
        }
        ResponsesAction::Show { id } => ctx
            .show(resource.surface(), &item_path(resource, &id)?)
            .await,
        ResponsesAction::Search(args) => ctx.search(resource, &args, RESPONSE_COLUMNS).await,
        ResponsesAction::Delete { id } => ctx.delete(resource, &id).await,
    }
}

async fn conversations(ctx: &Context, action: ConversationsAction) -> Result<()> {
    let resource = Resource::Conversations;
    match action {
        ConversationsAction::List(page) => {
            ctx.list(resource, collection(resource), &page, CONVERSATION_COLUMNS)
                .await
        }
        ConversationsAction::Show { id } => {
            let path = item_path(resource, &id)?;
            ctx.show(resource.surface(), &path).await?;
            if ctx.mode == OutputMode::Table {
                println!("\nItems:");
            } else {
                print!("{JSON_SEPARATOR}");
            }
            ctx.list(
                Resource::ConversationItems,
                &format!("{path}/items"),
                &PageArgs::default(),
                ITEM_COLUMNS,
            )
            .await
        }
        ConversationsAction::Search(args) => {
            ctx.search(resource, &args, CONVERSATION_COLUMNS).await
        }
        ConversationsAction::Delete { id } => ctx.delete(resource, &id).await,
    }
}

async fn threads(ctx: &Context, action: ThreadsAction) -> Result<()> {
    let resource = Resource::Threads;
    match action {
        ThreadsAction::List(page) => {
            ctx.list(resource, collection(resource), &page, THREAD_COLUMNS)
                .await
        }
        ThreadsAction::Show(args) => thread_show(ctx, args).await,
        ThreadsAction::Runs { action } => runs(ctx, action).await,
    }
}

async fn thread_show(ctx: &Context, args: ThreadShowArgs) -> Result<()> {
    let id = require_id(&args.id, "threadId")?;
    let surface = Resource::Threads.surface();
    let thread = ctx
        .client
        .get(surface, &item_path(Resource::Threads, id)?, &[])
        .await?;

    let mut params = list_params(&args.page);
    params.limit.get_or_insert(TRANSCRIPT_PAGE_SIZE);
    params.order.get_or_insert(SortOrder::Asc);
    let mut query = params.to_query();
    if let Some(run_id) = args.run_id.as_deref().filter(|r| !r.is_empty()) {
        query.push(("run_id".to_string(), run_id.to_string()));
    }

    let messages = match ctx
        .client
        .get(surface, &format!("threads/{}/messages", encode(id)), &query)
        .await
    {
        Ok(messages) => Some(messages),
        Err(err) => {
            warn!("Failed to fetch messages: {err}");
            None
        }
    };

    if ctx.mode != OutputMode::Table {
        let mut out = stringify(&thread, ctx.mode);
        if let Some(messages) = &messages {
            out.push_str(JSON_SEPARATOR);
            out.push_str(&stringify(messages, ctx.mode));
        }
        println!("{out}");
        return Ok(());
    }

    let records = messages
        .map(|m| into_records(m, Resource::Messages.list_key()))
        .unwrap_or_default();
    let options = TranscriptOptions {
        show_ids: args.show_ids,
        show_citations: args.show_citations,
        max_body: args.max_body,
        no_wrap: args.no_wrap,
    };
    println!("{}", render_transcript(id, &thread, &records, &options));
    Ok(())
}

async fn runs(ctx: &Context, action: RunsAction) -> Result<()> {
    let surface = Resource::Runs.surface();
    match action {
        RunsAction::List { thread_id, page } => {
            let thread_id = require_id(&thread_id, "threadId")?;
            ctx.list(
                Resource::Runs,
                &format!("threads/{}/runs", encode(thread_id)),
                &page,
                RUN_COLUMNS,
            )
            .await
        }
        RunsAction::Show { thread_id, run_id } => {
            let path = format!(
                "threads/{}/runs/{}",
                encode(require_id(&thread_id, "threadId")?),
                encode(require_id(&run_id, "runId")?)
            );
            ctx.show(surface, &path).await
        }
    }
}

async fn files(ctx: &Context, action: FilesAction) -> Result<()> {
    let resource = Resource::Files;
    match action {
        FilesAction::List(page) => {
            ctx.list(resource, collection(resource), &page, FILE_COLUMNS)
                .await
        }
        FilesAction::Show { id } => ctx
            .show(resource.surface(), &item_path(resource, &id)?)
            .await,
    }
}

async fn vector_stores(ctx: &Context, action: VectorStoresAction) -> Result<()> {
    let resource = Resource::VectorStores;
    match action {
        VectorStoresAction::List(page) => {
            ctx.list(resource, collection(resource), &page, VECTOR_STORE_COLUMNS)
                .await
        }
        VectorStoresAction::Show { id } => ctx
            .show(resource.surface(), &item_path(resource, &id)?)
            .await,
        VectorStoresAction::Files { action } => vector_store_files(ctx, action).await,
    }
}

async fn vector_store_files(ctx: &Context, action: VectorStoreFilesAction) -> Result<()> {
    let resource = Resource::VectorStoreFiles;
    match action {
        VectorStoreFilesAction::List {
            vector_store_id,
            page,
        } => {
            let path = format!(
                "vector_stores/{}/files",
                encode(require_id(&vector_store_id, "vectorStoreId")?)
            );
            ctx.list(resource, &path, &page, VECTOR_STORE_FILE_COLUMNS)
                .await
        }
        VectorStoreFilesAction::Show {
            vector_store_id,
            file_id,
        } => {
            let path = format!(
                "vector_stores/{}/files/{}",
                encode(require_id(&vector_store_id, "vectorStoreId")?),
                encode(require_id(&file_id, "fileId")?)
            );
            ctx.show(resource.surface(), &path).await
        }
    }
}
