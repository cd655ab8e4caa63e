use std::{
    cmp::Reverse,
    collections::{BTreeMap, BTreeSet},
};

use futures::{TryStreamExt, future::join_all};
use tracing::{debug, instrument};

use crate::{
    error::ServiceError,
    services::transport_call::bounded,
    state::{
        SharedState,
        game::{GroupId, GroupInfo, UserId, UserStats},
    },
};

/// Leaderboard of the group: most finds first, ties broken by the latest find.
///
/// Users whose display name cannot be resolved are listed as `User {id}`.
#[instrument(skip(state))]
pub async fn get_stats(
    state: &SharedState,
    group_id: GroupId,
) -> Result<Vec<UserStats>, ServiceError> {
    let game = state.game_state().await?;
    if game.get_channel_id(group_id).await?.is_none() {
        return Err(ServiceError::NotInitialized);
    }

    let history = game.get_submission_history(group_id).await?;
    let users: Vec<(UserId, BTreeSet<u64>)> = game
        .iterate_all_user_submissions(group_id)
        .try_collect()
        .await?;

    let lines = users.into_iter().filter_map(|(user_id, numbers)| {
        let latest_number = numbers.last().copied()?;
        Some((user_id, numbers.len(), latest_number))
    });

    let mut stats = join_all(lines.map(|(user_id, count, latest_number)| {
        let latest_link = history.get(&latest_number).cloned();
        async move {
            UserStats {
                user_id,
                username: display_name(state, user_id).await,
                count,
                latest_number,
                latest_link,
            }
        }
    }))
    .await;

    stats.sort_by_key(|line| (Reverse(line.count), Reverse(line.latest_number), line.user_id));
    Ok(stats)
}

async fn display_name(state: &SharedState, user_id: UserId) -> String {
    let resolved = bounded(
        state.config().post_timeout,
        "username lookup",
        state.transport().resolve_username(user_id),
    )
    .await;

    match resolved {
        Ok(name) => name,
        Err(err) => {
            debug!(user_id, error = %err, "username unresolved; using fallback");
            format!("User {user_id}")
        }
    }
}

/// Current counter, link to the latest find and the attached channel.
#[instrument(skip(state))]
pub async fn get_info(state: &SharedState, group_id: GroupId) -> Result<GroupInfo, ServiceError> {
    let game = state.game_state().await?;
    let channel_id = game
        .get_channel_id(group_id)
        .await?
        .ok_or(ServiceError::NotInitialized)?;
    let current_number = game
        .get_current_number(group_id)
        .await?
        .ok_or(ServiceError::NotInitialized)?;

    let latest_link = if current_number > 0 {
        game.get_submission_link(group_id, current_number).await?
    } else {
        None
    };

    Ok(GroupInfo {
        current_number,
        latest_link,
        channel_id,
    })
}

/// Every found number with its proof link, ascending.
#[instrument(skip(state))]
pub async fn get_history(
    state: &SharedState,
    group_id: GroupId,
) -> Result<BTreeMap<u64, String>, ServiceError> {
    let game = state.game_state().await?;
    Ok(game.get_submission_history(group_id).await?)
}

/// Numbers found by one user in the group.
#[instrument(skip(state))]
pub async fn get_user_submissions(
    state: &SharedState,
    group_id: GroupId,
    user_id: UserId,
) -> Result<BTreeSet<u64>, ServiceError> {
    let game = state.game_state().await?;
    Ok(game.get_user_submissions(group_id, user_id).await?)
}
