/// Property-based tests for swap barriers
/// Whatever subset of the participants arrives, every participant ends up
/// in exactly one release of the frame and the frame is desynchronized
/// exactly when someone was missing

use std::time::{Duration, Instant};

use proptest::prelude::*;

use lockstep_server::{Participant, SwapBarrier};
use lockstep_shared::{NodeId, ObjectId};

fn participants(count: usize) -> Vec<Participant> {
    (0..count as u32)
        .map(|index| Participant {
            channel: ObjectId::new(100 + index),
            name: format!("channel-{}", index),
            node: NodeId::new(2 + index),
        })
        .collect()
}

proptest! {
    #[test]
    fn every_participant_is_released_once(
        arrivals in prop::collection::vec(any::<bool>(), 1..8),
        late in any::<bool>(),
    ) {
        let start = Instant::now();
        let timeout = Duration::from_millis(100);
        let barrier = SwapBarrier::new("wall", timeout);
        let expected = participants(arrivals.len());
        barrier.expect(1, expected.clone(), start);

        let mut releases = Vec::new();
        for (participant, arrives) in expected.iter().zip(&arrivals) {
            if *arrives {
                releases.extend(barrier.arrive(1, participant.channel, start).unwrap());
            }
        }
        releases.extend(barrier.expire(start + timeout));

        let missing: Vec<Participant> = expected
            .iter()
            .zip(&arrivals)
            .filter(|(_, arrives)| !**arrives)
            .map(|(participant, _)| participant.clone())
            .collect();
        prop_assert_eq!(releases.len(), 1);
        prop_assert_eq!(releases[0].desynchronized, !missing.is_empty());
        prop_assert_eq!(&releases[0].missing, &missing);
        prop_assert_eq!(
            releases[0].released.len() + missing.len(),
            expected.len()
        );
        prop_assert!(!barrier.is_pending(1));

        // stragglers are released on their own, still desynchronized
        if late {
            for participant in &missing {
                let straggler = barrier
                    .arrive(1, participant.channel, start + timeout * 2)
                    .unwrap();
                prop_assert_eq!(straggler.len(), 1);
                prop_assert!(straggler[0].desynchronized);
                prop_assert_eq!(&straggler[0].released, &vec![participant.clone()]);
            }
        }
    }
}
