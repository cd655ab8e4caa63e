use tracing::{debug, info, instrument, warn};

use crate::{
    error::ServiceError,
    services::transport_call::bounded,
    state::{
        PendingInit, SharedState,
        game::{GroupId, GroupInfo, UserId},
        game_state::GameStateManager,
        lifecycle::{GroupPhase, LifecycleEvent},
    },
};

/// Derive the phase of a group from persisted state and pending conversations.
pub async fn group_phase(
    state: &SharedState,
    game: &GameStateManager,
    group_id: GroupId,
) -> Result<GroupPhase, ServiceError> {
    let has_channel = game.get_channel_id(group_id).await?.is_some();
    Ok(GroupPhase::derive(
        has_channel,
        state.pending_inits().contains_key(&group_id),
    ))
}

/// Start the setup conversation. Repeating it while pending is a no-op.
#[instrument(skip(state))]
pub async fn begin_init(
    state: &SharedState,
    group_id: GroupId,
    user_id: UserId,
) -> Result<GroupPhase, ServiceError> {
    let game = state.game_state().await?;
    let phase = group_phase(state, &game, group_id).await?;
    let next = phase.next(LifecycleEvent::BeginInit)?;

    state
        .pending_inits()
        .entry(group_id)
        .or_insert(PendingInit {
            requested_by: user_id,
        });
    info!(?phase, "group setup started; awaiting channel");

    Ok(next)
}

/// Attach `channel_handle` to the group after checking the bot can post there.
///
/// The pending conversation ends whatever the outcome; a failed attempt
/// leaves the group idle so setup can be started again.
#[instrument(skip(state))]
pub async fn complete_init(
    state: &SharedState,
    group_id: GroupId,
    channel_handle: &str,
) -> Result<GroupInfo, ServiceError> {
    let outcome = attach_channel(state, group_id, channel_handle).await;
    if let Some((_, setup)) = state.pending_inits().remove(&group_id) {
        let event = match &outcome {
            Ok(_) => LifecycleEvent::ChannelAccepted,
            Err(_) => LifecycleEvent::ChannelRejected,
        };
        let to = GroupPhase::AwaitingChannel.next(event).ok();
        debug!(
            requested_by = setup.requested_by,
            ?event,
            ?to,
            "setup conversation closed"
        );
    }

    match &outcome {
        Ok(info) => info!(channel_id = %info.channel_id, "group initialized"),
        Err(err) if err.is_infrastructure() => {
            warn!(code = err.code(), error = %err, "group setup failed")
        }
        Err(err) => debug!(code = err.code(), error = %err, "group setup rejected"),
    }

    outcome
}

async fn attach_channel(
    state: &SharedState,
    group_id: GroupId,
    channel_handle: &str,
) -> Result<GroupInfo, ServiceError> {
    let game = state.game_state().await?;
    group_phase(state, &game, group_id)
        .await?
        .next(LifecycleEvent::ChannelAccepted)?;

    let channel_id = validate_channel(channel_handle, state.config().channel_marker)?;

    let writable = bounded(
        state.config().post_timeout,
        "channel probe",
        state.transport().probe_channel_admin(channel_id.clone()),
    )
    .await?;
    if !writable {
        return Err(ServiceError::ChannelNotWritable(channel_id));
    }

    let _guard = state.locks().acquire(group_id).await;
    // Re-check under the lock: a concurrent setup or a cancel may have won.
    group_phase(state, &game, group_id)
        .await?
        .next(LifecycleEvent::ChannelAccepted)?;

    game.set_current_number(group_id, 0).await?;
    if let Err(err) = game.set_channel_id(group_id, &channel_id).await {
        if let Err(undo) = game.clear_current_number(group_id).await {
            warn!(error = %undo, "failed to roll back counter after channel write failure");
        }
        return Err(err.into());
    }

    Ok(GroupInfo {
        current_number: 0,
        latest_link: None,
        channel_id,
    })
}

/// Drop a pending setup conversation; returns whether one existed.
#[instrument(skip(state))]
pub fn cancel_init(state: &SharedState, group_id: GroupId) -> bool {
    let pending = state.pending_inits().contains_key(&group_id);
    // A stored channel is not consulted: cancel only ever touches the conversation.
    if let Err(err) = GroupPhase::derive(false, pending).next(LifecycleEvent::Cancel) {
        debug!(%err, "nothing to cancel");
        return false;
    }

    match state.pending_inits().remove(&group_id) {
        Some((_, setup)) => {
            info!(requested_by = setup.requested_by, "group setup cancelled");
            true
        }
        None => false,
    }
}

/// Wipe every key of the group. Only group administrators may do this.
#[instrument(skip(state))]
pub async fn reset(
    state: &SharedState,
    group_id: GroupId,
    user_id: UserId,
) -> Result<(), ServiceError> {
    let is_admin = bounded(
        state.config().post_timeout,
        "admin check",
        state.transport().is_group_admin(group_id, user_id),
    )
    .await?;
    if !is_admin {
        debug!("reset refused: requester is not a group administrator");
        return Err(ServiceError::PermissionDenied);
    }

    let game = state.game_state().await?;
    let guard = state.locks().acquire(group_id).await;
    let phase = group_phase(state, &game, group_id).await?;
    let next = phase.next(LifecycleEvent::Reset)?;
    state.pending_inits().remove(&group_id);

    if let Err(err) = game.delete_group(group_id).await {
        warn!(error = %err, "group reset incomplete");
        return Err(err.into());
    }

    drop(guard);
    state.locks().release(group_id);
    info!(from = ?phase, to = ?next, "group reset");
    Ok(())
}

/// Normalise a public channel handle such as `@my_channel`.
pub fn validate_channel(handle: &str, marker: char) -> Result<String, ServiceError> {
    let handle = handle.trim();
    let valid = handle
        .strip_prefix(marker)
        .is_some_and(|name| !name.is_empty() && !name.chars().any(char::is_whitespace));

    if valid {
        Ok(handle.to_owned())
    } else {
        Err(ServiceError::InvalidChannel(handle.to_owned()))
    }
}
