//! Greedy spatial grouping of samples into hotspots.

use chrono::NaiveDateTime;
use std::collections::HashSet;

use crate::analyzers::types::Hotspot;
use crate::model::VehicleRecord;

/// Members must lie strictly closer than this to their hotspot's seed, in
/// meters.
pub const HOTSPOT_RADIUS_M: f64 = 100.0;

/// Groups `samples` around seeds picked in input order.
///
/// Each unvisited sample becomes a seed and claims every other unvisited
/// sample within [`HOTSPOT_RADIUS_M`] of it. Membership is measured against
/// the seed only, so two members of one hotspot may be further apart than
/// the radius, and a sample claimed by an earlier seed is never reassigned.
/// Samples are identified by `(vehicle_id, timestamp)`.
pub fn find_hotspots(samples: &[(&VehicleRecord, f64)]) -> Vec<Hotspot> {
    let mut visited: HashSet<(&str, NaiveDateTime)> = HashSet::new();
    let mut hotspots = Vec::new();

    for (seed, _) in samples {
        if !visited.insert(seed.identity()) {
            continue;
        }

        let mut members = 1;
        for (other, _) in samples {
            if !visited.contains(&other.identity())
                && seed.position.distance_to(&other.position) < HOTSPOT_RADIUS_M
            {
                visited.insert(other.identity());
                members += 1;
            }
        }

        hotspots.push(Hotspot {
            position: seed.position,
            members,
        });
    }

    hotspots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use chrono::NaiveDate;

    fn record(id: &str, s: u32, lat: f64, lon: f64) -> VehicleRecord {
        VehicleRecord {
            vehicle_id: id.to_string(),
            line: "1".to_string(),
            brigade: "1".to_string(),
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, s)
                .unwrap(),
            position: Position::new(lat, lon),
        }
    }

    // 0.0005 degrees of latitude is ~55.6 m.
    const STEP: f64 = 0.0005;

    #[test]
    fn test_three_close_records_make_one_hotspot() {
        let a = record("1", 0, 52.0, 21.0);
        let b = record("2", 0, 52.0 + STEP / 2.0, 21.0);
        let c = record("3", 0, 52.0, 21.0 + STEP);
        let samples = vec![(&a, 15.0), (&b, 15.0), (&c, 15.0)];

        let hotspots = find_hotspots(&samples);

        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].members, 3);
        assert_eq!(hotspots[0].position, a.position);
    }

    #[test]
    fn test_membership_is_relative_to_seed_only() {
        // b is ~56 m from both a and c; a and c are ~111 m apart.
        let b = record("2", 0, 52.0 + STEP, 21.0);
        let a = record("1", 0, 52.0, 21.0);
        let c = record("3", 0, 52.0 + 2.0 * STEP, 21.0);

        let seeded_in_middle = find_hotspots(&[(&b, 15.0), (&a, 15.0), (&c, 15.0)]);
        assert_eq!(seeded_in_middle.len(), 1);
        assert_eq!(seeded_in_middle[0].members, 3);

        // Seeding at the edge leaves c for a hotspot of its own; there is no
        // transitive merge through b.
        let seeded_at_edge = find_hotspots(&[(&a, 15.0), (&b, 15.0), (&c, 15.0)]);
        let members: Vec<_> = seeded_at_edge.iter().map(|h| h.members).collect();
        assert_eq!(members, vec![2, 1]);
        assert_eq!(seeded_at_edge[1].position, c.position);
    }

    #[test]
    fn test_distant_records_stay_apart() {
        let a = record("1", 0, 52.0, 21.0);
        let b = record("2", 0, 52.1, 21.0);

        let hotspots = find_hotspots(&[(&a, 15.0), (&b, 15.0)]);

        assert_eq!(hotspots.len(), 2);
        assert!(hotspots.iter().all(|h| h.members == 1));
    }

    #[test]
    fn test_duplicate_identity_is_counted_once() {
        let a = record("1", 0, 52.0, 21.0);
        let a_again = record("1", 0, 52.0, 21.0);

        let hotspots = find_hotspots(&[(&a, 15.0), (&a_again, 15.0)]);

        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].members, 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(find_hotspots(&[]).is_empty());
    }
}
