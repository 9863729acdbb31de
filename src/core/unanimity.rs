use std::collections::{BTreeMap, HashMap, HashSet};
use crate::models::{Session, SwipeResult};

/// Fewest completed sessions that can produce a match
pub const MIN_PARTICIPANTS: usize = 2;

/// A tile every completed session voted "Yes" on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnanimousTile {
    pub tile_id: String,
    pub participant_count: usize,
}

#[derive(Debug)]
struct TileTally {
    voters: usize,
    all_yes: bool,
}

/// Keep one decision per (session, tile)
///
/// Later timestamps win; equal timestamps fall back to the greater record id
/// so the fold does not depend on read order.
pub fn fold_latest_decisions(swipes: &[SwipeResult]) -> HashMap<(&str, &str), &SwipeResult> {
    let mut latest: HashMap<(&str, &str), &SwipeResult> = HashMap::with_capacity(swipes.len());

    for swipe in swipes {
        let key = (swipe.session_id.as_str(), swipe.tile_id.as_str());
        let newer = latest.get(&key).map_or(true, |current| {
            (swipe.timestamp, swipe.id.as_str()) > (current.timestamp, current.id.as_str())
        });
        if newer {
            latest.insert(key, swipe);
        }
    }

    latest
}

/// Compute the tiles unanimously approved by the completed sessions
///
/// Decisions from sessions that are not complete are ignored. A tile
/// qualifies only when every completed session has a decision on it and all
/// of those decisions are "Yes". Fewer than `min_participants` completed
/// sessions (never less than [`MIN_PARTICIPANTS`]) yields nothing.
///
/// Results are ordered by tile id.
pub fn unanimous_tiles(
    sessions: &[Session],
    swipes: &[SwipeResult],
    min_participants: usize,
) -> Vec<UnanimousTile> {
    let completed: HashSet<&str> = sessions
        .iter()
        .filter(|s| s.is_complete)
        .map(|s| s.id.as_str())
        .collect();

    if completed.len() < min_participants.max(MIN_PARTICIPANTS) {
        return Vec::new();
    }

    let mut tallies: BTreeMap<&str, TileTally> = BTreeMap::new();
    for ((session_id, tile_id), swipe) in fold_latest_decisions(swipes) {
        if !completed.contains(session_id) {
            continue;
        }
        let tally = tallies.entry(tile_id).or_insert(TileTally {
            voters: 0,
            all_yes: true,
        });
        tally.voters += 1;
        tally.all_yes &= swipe.decision.is_yes();
    }

    tallies
        .into_iter()
        .filter(|(_, tally)| tally.all_yes && tally.voters == completed.len())
        .map(|(tile_id, _)| UnanimousTile {
            tile_id: tile_id.to_string(),
            participant_count: completed.len(),
        })
        .collect()
}
