use super::client::ApiSurface;

/// Resource kinds exposed by the agent service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Agents,
    Assistants,
    Conversations,
    ConversationItems,
    Responses,
    Threads,
    Runs,
    Messages,
    Files,
    VectorStores,
    VectorStoreFiles,
}

impl Resource {
    /// Domain-specific key a listing payload may wrap its records in.
    pub fn list_key(self) -> &'static str {
        match self {
            Resource::Agents => "agents",
            Resource::Assistants => "assistants",
            Resource::Conversations => "conversations",
            Resource::ConversationItems => "items",
            Resource::Responses => "responses",
            Resource::Threads => "threads",
            Resource::Runs => "runs",
            Resource::Messages => "messages",
            Resource::Files | Resource::VectorStoreFiles => "files",
            Resource::VectorStores => "vector_stores",
        }
    }

    pub fn surface(self) -> ApiSurface {
        match self {
            Resource::Agents
            | Resource::Conversations
            | Resource::ConversationItems
            | Resource::Responses => ApiSurface::Agents,
            _ => ApiSurface::Classic,
        }
    }

    /// Collection path for top-level resources; nested ones are built by the caller.
    pub fn collection(self) -> Option<&'static str> {
        match self {
            Resource::Agents => Some("agents"),
            Resource::Assistants => Some("assistants"),
            Resource::Conversations => Some("openai/conversations"),
            Resource::Responses => Some("openai/responses"),
            Resource::Threads => Some("threads"),
            Resource::Files => Some("files"),
            Resource::VectorStores => Some("vector_stores"),
            Resource::ConversationItems
            | Resource::Runs
            | Resource::Messages
            | Resource::VectorStoreFiles => None,
        }
    }

    /// Path of a single top-level item, with the id percent-encoded.
    pub fn item_path(self, id: &str) -> Option<String> {
        self.collection()
            .map(|base| format!("{}/{}", base, urlencoding::encode(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v2_resources_use_agent_surface() {
        assert_eq!(Resource::Conversations.surface(), ApiSurface::Agents);
        assert_eq!(Resource::Responses.surface(), ApiSurface::Agents);
        assert_eq!(Resource::Threads.surface(), ApiSurface::Classic);
        assert_eq!(Resource::Assistants.surface(), ApiSurface::Classic);
    }

    #[test]
    fn item_paths_encode_ids() {
        assert_eq!(
            Resource::Responses.item_path("resp 1/x").as_deref(),
            Some("openai/responses/resp%201%2Fx")
        );
        assert_eq!(Resource::Runs.item_path("run_1"), None);
    }
}
