mod common;

use common::{GROUP, Harness, media};
use number_hunt_back::services::submission_service::submit;
use proptest::prelude::*;

/// Replay `claims` against a fresh group and return the counter after each one,
/// together with the indices of the claims that were accepted.
fn replay(claims: &[(i64, i64)]) -> (Vec<u64>, Vec<usize>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    runtime.block_on(async {
        let h = Harness::initialized().await;
        let game = h.state.game_state().await.unwrap();
        let mut counters = Vec::with_capacity(claims.len());
        let mut accepted = Vec::new();

        for (index, (user_id, claimed)) in claims.iter().enumerate() {
            if submit(&h.state, GROUP, *user_id, Some(*claimed), media(index as i64))
                .await
                .is_ok()
            {
                accepted.push(index);
            }
            counters.push(game.get_current_number(GROUP).await.unwrap().unwrap());
        }

        (counters, accepted)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn counter_never_decreases(claims in prop::collection::vec((1i64..4, -2i64..10), 1..40)) {
        let (counters, accepted) = replay(&claims);

        for pair in counters.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }

        // Each accepted claim moved the counter to exactly the claimed number.
        for index in accepted {
            prop_assert_eq!(counters[index] as i64, claims[index].1);
        }
    }

    #[test]
    fn next_number_is_always_accepted(steps in 1i64..20) {
        let claims: Vec<_> = (1..=steps).map(|number| (7, number)).collect();
        let (counters, accepted) = replay(&claims);

        prop_assert_eq!(accepted.len() as i64, steps);
        prop_assert_eq!(counters.last().copied(), Some(steps as u64));
    }
}
