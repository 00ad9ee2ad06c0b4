//! Router actor task.

use tokio::sync::mpsc;

use super::commands::RouterCommand;
use super::handle::RouterHandle;
use crate::routing::{NodeId, RouterState};

const COMMAND_BUFFER: usize = 64;

/// Spawns a task that exclusively owns `state` and returns its handle.
///
/// Must be called from within a tokio runtime.
pub fn spawn_router(state: RouterState) -> RouterHandle {
    let (sender, receiver) = mpsc::channel(COMMAND_BUFFER);
    let handle = RouterHandle::new(state.id().clone(), sender);

    tokio::spawn(async move {
        run_actor_loop(state, receiver).await;
    });

    handle
}

async fn run_actor_loop(mut state: RouterState, mut receiver: mpsc::Receiver<RouterCommand>) {
    tracing::debug!("Router {} actor started", state.id());

    while let Some(command) = receiver.recv().await {
        if !handle_command(&mut state, command) {
            break;
        }
    }

    tracing::debug!("Router {} actor stopped", state.id());
}

/// Handles one command. Returns false when the actor should stop.
fn handle_command(state: &mut RouterState, command: RouterCommand) -> bool {
    match command {
        RouterCommand::AnnounceAll { responder } => {
            let neighbors: Vec<NodeId> = state.neighbors().keys().cloned().collect();
            let announcements = neighbors
                .into_iter()
                .map(|neighbor| {
                    let vector = state.announce(&neighbor);
                    state.record_sent();
                    (neighbor, vector)
                })
                .collect();
            let _ = responder.send(announcements);
        }

        RouterCommand::RelaxBatch {
            messages,
            responder,
        } => {
            let changes = messages
                .iter()
                .flat_map(|(sender, vector)| state.relax(sender, vector))
                .collect();
            let _ = responder.send(changes);
        }

        RouterCommand::SetNeighborCost {
            neighbor,
            cost,
            responder,
        } => {
            let _ = responder.send(state.set_neighbor_cost(&neighbor, cost));
        }

        RouterCommand::GetRoutingTable { responder } => {
            let _ = responder.send(state.routing_table().clone());
        }

        RouterCommand::GetDistanceVector { responder } => {
            let _ = responder.send(state.distance_vector());
        }

        RouterCommand::GetMessageCounts { responder } => {
            let _ = responder.send(state.message_counts());
        }

        RouterCommand::Shutdown { responder } => {
            let _ = responder.send(());
            return false;
        }
    }

    true
}
