use std::sync::Arc;

use anyhow::{Context, Result};

use crate::{
    api::WebSocketConnector,
    cli::{Cli, Command},
    domain::{chat_view_state::ChatViewState, message::GroupId},
    ui,
    usecases::{
        bootstrap,
        chat_session::{ChatServices, ChatSession},
        context::AppContext,
        history::load_history,
        shell::DefaultChatOrchestrator,
    },
};

const CHAT_OPEN_FAILED: &str = "SYNC_CHAT_OPEN_FAILED";
const HISTORY_USER_UNKNOWN: &str = "SYNC_HISTORY_USER_UNKNOWN";

pub fn run(cli: Cli) -> Result<()> {
    let group_id = cli
        .group
        .map(GroupId)
        .context("missing --group <id>: which group chat to open")?;
    let context = bootstrap::bootstrap(cli.config.as_deref())?;

    match cli.command_or_default() {
        Command::Chat => run_chat(&context, group_id),
        Command::History => run_history(&context, group_id),
    }
}

fn run_chat(context: &AppContext, group_id: GroupId) -> Result<()> {
    let services = ChatServices {
        backend: context.api.clone(),
        source: context.api.clone(),
        connector: Arc::new(WebSocketConnector::new(Arc::clone(&context.api))),
    };

    let mut session = match ChatSession::open(group_id, services, context.config.sync_settings())
    {
        Ok(session) => session,
        Err(error) => {
            tracing::error!(
                code = CHAT_OPEN_FAILED,
                group_id = %group_id,
                error = %error,
                "chat view could not be opened"
            );
            return Err(error.into());
        }
    };

    tracing::info!(
        group_id = %session.group_id(),
        user_id = session.local_user().id,
        "chat session open"
    );

    let updates = session
        .take_updates()
        .context("chat updates were already taken")?;
    let mut event_source = ui::CrosstermEventSource::new(updates);
    let state = ChatViewState::new(format!("Group {group_id}"), Some(session.local_user().id));
    let mut orchestrator = DefaultChatOrchestrator::new(state, &session);

    ui::shell::start(
        context.config.display.offset(),
        &mut event_source,
        &mut orchestrator,
    )
}

fn run_history(context: &AppContext, group_id: GroupId) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    let lines = runtime.block_on(async {
        let local_user_id = match context.api.current_user().await {
            Ok(user) => Some(user.id),
            Err(error) => {
                tracing::warn!(
                    code = HISTORY_USER_UNKNOWN,
                    error = %error,
                    "current user unavailable; own messages will not be labelled"
                );
                None
            }
        };

        load_history(
            &*context.api,
            group_id,
            local_user_id,
            context.config.display.offset(),
        )
        .await
    })?;

    if lines.is_empty() {
        println!("No messages in group {group_id}.");
    }
    for line in lines {
        println!("{line}");
    }

    Ok(())
}
