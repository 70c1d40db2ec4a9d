use anyhow::Result;
use chrono::FixedOffset;

use crate::{
    domain::chat_view_state::ChatViewState,
    usecases::contracts::{AppEventSource, ChatOrchestrator},
};

use super::{terminal::TerminalSession, view};

pub fn start(
    offset: FixedOffset,
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ChatOrchestrator,
) -> Result<()> {
    tracing::info!(
        group = orchestrator.state().group_title(),
        "starting chat TUI"
    );

    let mut terminal = TerminalSession::new()?;
    run_loop(event_source, orchestrator, |state| {
        terminal.draw(|frame| view::render(frame, state, offset))
    })
}

fn run_loop<D>(
    event_source: &mut dyn AppEventSource,
    orchestrator: &mut dyn ChatOrchestrator,
    mut draw: D,
) -> Result<()>
where
    D: FnMut(&ChatViewState) -> Result<()>,
{
    while orchestrator.state().is_running() {
        draw(orchestrator.state())?;

        if let Some(event) = event_source.next_event()? {
            orchestrator.handle_event(event)?;
        }
    }

    Ok(())
}
