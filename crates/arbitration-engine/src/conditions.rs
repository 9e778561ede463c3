//! Challenge eligibility
//!
//! A candidate may be challenged only inside the window the source chain's
//! relation allows: `[sourceTxTime + min, sourceTxTime + max]`, both ends
//! inclusive, all in seconds.

use arbitration_types::{ArbitrationTransaction, ChainRelation};

/// Find the relation for a chain id
pub fn find_relation(relations: &[ChainRelation], chain_id: u64) -> Option<&ChainRelation> {
    relations.iter().find(|c| c.id == chain_id)
}

/// Inclusive challenge window for a candidate, if it can be computed
pub fn challenge_window(tx: &ArbitrationTransaction, chain: &ChainRelation) -> Option<(u64, u64)> {
    let source_time = tx.source_tx_time?;
    Some((
        source_time.saturating_add(chain.min_challenge_delay_secs),
        source_time.saturating_add(chain.max_challenge_delay_secs),
    ))
}

/// Whether `tx` can be challenged at `now_secs`
pub fn is_eligible(tx: &ArbitrationTransaction, relations: &[ChainRelation], now_secs: u64) -> bool {
    let Some(chain_id) = tx.source_chain_id else {
        return false;
    };
    let Some(chain) = find_relation(relations, chain_id) else {
        return false;
    };
    match challenge_window(tx, chain) {
        Some((min_time, max_time)) => min_time <= now_secs && now_secs <= max_time,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: u64 = 1_700_000_000;

    fn relation(id: u64, min: u64, max: u64) -> ChainRelation {
        ChainRelation {
            id,
            native_token: "0x0".to_string(),
            min_challenge_delay_secs: min,
            max_challenge_delay_secs: max,
            min_verify_dest_delay_secs: 0,
            max_verify_dest_delay_secs: 0,
            batch_limit: 100,
            enable_timestamp: 0,
            spvs: vec![],
        }
    }

    fn tx(chain_id: u64, time: u64) -> ArbitrationTransaction {
        ArbitrationTransaction {
            source_chain_id: Some(chain_id),
            source_tx_time: Some(time),
            ..Default::default()
        }
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let relations = vec![relation(5, 100, 1000)];
        let candidate = tx(5, T);

        assert!(!is_eligible(&candidate, &relations, T + 50));
        assert!(!is_eligible(&candidate, &relations, T + 99));
        assert!(is_eligible(&candidate, &relations, T + 100));
        assert!(is_eligible(&candidate, &relations, T + 500));
        assert!(is_eligible(&candidate, &relations, T + 1000));
        assert!(!is_eligible(&candidate, &relations, T + 1001));
    }

    #[test]
    fn test_unknown_chain_is_not_eligible() {
        let relations = vec![relation(5, 0, u64::MAX)];
        assert!(!is_eligible(&tx(1, T), &relations, T));
        assert!(!is_eligible(&tx(5, T), &[], T));
    }

    #[test]
    fn test_missing_fields_are_not_eligible() {
        let relations = vec![relation(5, 0, 1000)];
        let mut candidate = tx(5, T);
        candidate.source_tx_time = None;
        assert!(!is_eligible(&candidate, &relations, T));

        let mut candidate = tx(5, T);
        candidate.source_chain_id = None;
        assert!(!is_eligible(&candidate, &relations, T));
    }

    #[test]
    fn test_picks_matching_relation() {
        let relations = vec![relation(1, 0, 10), relation(5, 100, 1000)];
        assert!(is_eligible(&tx(5, T), &relations, T + 500));
        assert!(!is_eligible(&tx(1, T), &relations, T + 500));
    }

    #[test]
    fn test_window_saturates() {
        let chain = relation(5, 10, u64::MAX);
        let window = challenge_window(&tx(5, T), &chain).unwrap();
        assert_eq!(window, (T + 10, u64::MAX));
    }
}
