//! Consensus detection. Pure and stateless: both the server services and
//! the client reconciler evaluate the same rule over whatever participant
//! and vote sets they currently hold, so neither side ever stores a
//! "revealed" flag.

use std::collections::HashSet;

use uuid::Uuid;

/// Whether every participant has a recorded vote for the current task.
///
/// True when the participant set is non-empty and the voter set is a
/// superset of it. A pass vote counts as voted; voters absent from the
/// participant set (stale rows from users who never joined this reader's
/// view) are ignored.
pub fn all_voted<'a, P, V>(participants: P, voters: V) -> bool
where
    P: IntoIterator<Item = &'a Uuid>,
    V: IntoIterator<Item = &'a Uuid>,
{
    let voted: HashSet<&Uuid> = voters.into_iter().collect();
    let mut seen_any = false;
    for participant in participants {
        seen_any = true;
        if !voted.contains(participant) {
            return false;
        }
    }
    seen_any
}

/// Distribution of vote values for reveal display: `(value, count)` pairs
/// sorted ascending with passes last.
pub fn tally<I>(votes: I) -> Vec<(Option<u8>, usize)>
where
    I: IntoIterator<Item = Option<u8>>,
{
    let mut counts: Vec<(Option<u8>, usize)> = Vec::new();
    for value in votes {
        match counts.iter_mut().find(|(existing, _)| *existing == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    counts.sort_by_key(|(value, _)| match value {
        Some(points) => (0, *points),
        None => (1, 0),
    });
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consensus_requires_every_participant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let participants = [a, b, c];

        assert!(!all_voted(participants.iter(), [a, b].iter()));
        assert!(all_voted(participants.iter(), [a, b, c].iter()));
    }

    #[test]
    fn empty_participant_set_never_reveals() {
        let voter = Uuid::new_v4();
        assert!(!all_voted([].iter(), [voter].iter()));
        assert!(!all_voted([].iter(), [].iter()));
    }

    #[test]
    fn stale_voters_outside_participant_set_are_ignored() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let participants = [a, b];

        assert!(all_voted(participants.iter(), [a, b, stranger].iter()));
        assert!(!all_voted(participants.iter(), [a, stranger].iter()));
    }

    #[test]
    fn tally_sorts_values_with_passes_last() {
        let distribution = tally([Some(8), Some(5), None, Some(5), Some(8), Some(5)]);
        assert_eq!(
            distribution,
            vec![(Some(5), 3), (Some(8), 2), (None, 1)]
        );
    }
}
