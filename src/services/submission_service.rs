use tracing::{debug, info, instrument, warn};

use crate::{
    error::ServiceError,
    services::{
        submission_adapter::SubmissionEvent,
        transport_call::bounded_post,
    },
    state::{
        SharedState,
        game::{Accepted, GroupId, MediaRef, UserId},
        game_state::GameStateManager,
        lifecycle::GroupPhase,
    },
};

/// Validate a claimed find and, when it is the next number, record it.
///
/// Checks run in a fixed order: malformed claim, uninitialized group,
/// number already found, number out of sequence. The accept path holds the
/// group lock from the first read until the counter moves, so concurrent
/// claims of the same number see exactly one winner.
#[instrument(name = "submit", skip(state, media))]
pub async fn submit(
    state: &SharedState,
    group_id: GroupId,
    user_id: UserId,
    claimed: Option<i64>,
    media: MediaRef,
) -> Result<Accepted, ServiceError> {
    let outcome = record(state, group_id, user_id, claimed, media).await;
    log_outcome(&outcome);
    outcome
}

/// Entry point for raw inbound events (caption or reply command).
#[instrument(name = "submit_event", skip(state, event))]
pub async fn submit_event(
    state: &SharedState,
    group_id: GroupId,
    user_id: UserId,
    event: SubmissionEvent,
) -> Result<Accepted, ServiceError> {
    let claim = event.claim();
    match claim.media {
        Some(media) => submit(state, group_id, user_id, claim.number, media).await,
        None => {
            debug!("command is not a reply to a media message");
            Err(ServiceError::InvalidFormat)
        }
    }
}

fn log_outcome(outcome: &Result<Accepted, ServiceError>) {
    match outcome {
        Ok(accepted) => info!(
            number = accepted.number,
            link = %accepted.proof_link,
            "submission accepted"
        ),
        Err(err) if err.is_infrastructure() => {
            warn!(code = err.code(), error = %err, "submission failed")
        }
        Err(err) => debug!(code = err.code(), error = %err, "submission rejected"),
    }
}

async fn record(
    state: &SharedState,
    group_id: GroupId,
    user_id: UserId,
    claimed: Option<i64>,
    media: MediaRef,
) -> Result<Accepted, ServiceError> {
    let raw = claimed.ok_or(ServiceError::InvalidFormat)?;
    let game = state.game_state().await?;
    let _guard = state.locks().acquire(group_id).await;

    let channel_id = game.get_channel_id(group_id).await?;
    let phase = GroupPhase::derive(
        channel_id.is_some(),
        state.pending_inits().contains_key(&group_id),
    );
    let channel_id = channel_id
        .filter(|_| phase.accepts_submissions())
        .ok_or(ServiceError::NotInitialized)?;
    let current = game
        .get_current_number(group_id)
        .await?
        .ok_or(ServiceError::NotInitialized)?;

    let wrong_number = || ServiceError::WrongNumber {
        expected: current.saturating_add(1),
        got: raw,
    };
    let Ok(claimed) = u64::try_from(raw) else {
        return Err(wrong_number());
    };

    if let Some(existing_link) = game.get_submission_link(group_id, claimed).await? {
        return Err(ServiceError::AlreadySubmitted { existing_link });
    }

    if !state.config().acceptance_policy.accepts(current, claimed) {
        return Err(wrong_number());
    }

    let mut undo = Undo {
        game: &game,
        group_id,
        user_id,
        number: claimed,
        membership: game.add_user_submission(group_id, user_id, claimed).await?,
        link: false,
    };

    let posted = bounded_post(
        state.config().post_timeout,
        state
            .transport()
            .post_media(channel_id, media, format!("#{claimed}")),
    )
    .await;
    let proof_link = match posted {
        Ok(link) => link,
        Err(err) => {
            undo.run().await;
            return Err(err);
        }
    };

    // The hash write may have landed even when it reports failure.
    undo.link = true;
    if let Err(err) = game
        .set_submission_link(group_id, claimed, &proof_link)
        .await
    {
        warn!(link = %proof_link, "proof posted but link could not be stored");
        undo.run().await;
        return Err(err.into());
    }

    if let Err(err) = game.set_current_number(group_id, claimed).await {
        warn!(link = %proof_link, "proof posted but counter could not be advanced");
        undo.run().await;
        return Err(err.into());
    }

    Ok(Accepted {
        number: claimed,
        proof_link,
    })
}

/// Writes to revert when an accept fails midway.
struct Undo<'a> {
    game: &'a GameStateManager,
    group_id: GroupId,
    user_id: UserId,
    number: u64,
    /// Only set when the membership did not exist before this submission.
    membership: bool,
    link: bool,
}

impl Undo<'_> {
    async fn run(self) {
        if self.link {
            if let Err(err) = self
                .game
                .remove_submission_link(self.group_id, self.number)
                .await
            {
                warn!(number = self.number, error = %err, "failed to roll back submission link");
            }
        }

        if self.membership {
            if let Err(err) = self
                .game
                .remove_user_submission(self.group_id, self.user_id, self.number)
                .await
            {
                warn!(number = self.number, error = %err, "failed to roll back user submission");
            }
        }
    }
}
