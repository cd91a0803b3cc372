use std::collections::HashMap;

use anyhow::Result;
use tracing::debug;

use crate::api::BackendClient;
use crate::fleet::{slot_title, CARD_SLOTS};
use crate::health::{format_thousands, health_color, Health};

/// One rendered status card.
#[derive(Debug, Clone)]
pub struct CardState {
    pub robot: &'static str,
    pub title: String,
    pub working: u64,
    pub health: Health,
    /// Mined total, already formatted with thousand separators.
    pub mined: String,
}

/// The grid as shown before the first successful refresh: every slot titled,
/// zeroed and gray. This is the one-time initialization step — it runs before
/// any polling starts, so a slot never appears half-built mid-cycle.
pub fn initial_grid() -> Vec<CardState> {
    CARD_SLOTS
        .iter()
        .map(|(robot, slot)| CardState {
            robot,
            title: slot_title(slot),
            working: 0,
            health: Health::Gray,
            mined: "0".to_string(),
        })
        .collect()
}

/// Build the full grid from the three payloads. Robots present in a payload
/// but absent from the static table are never written; robots missing from a
/// payload default to 0. Mined totals are looked up by UPPERCASED key and
/// null means 0.
pub fn build_grid(
    meta: &HashMap<String, u64>,
    working: &HashMap<String, u64>,
    mined: &HashMap<String, Option<u64>>,
) -> Vec<CardState> {
    CARD_SLOTS
        .iter()
        .map(|(robot, slot)| {
            let working_count = working.get(*robot).copied().unwrap_or(0);
            let meta_count = meta.get(*robot).copied().unwrap_or(0);
            let total = mined
                .get(&robot.to_uppercase())
                .copied()
                .flatten()
                .unwrap_or(0);
            CardState {
                robot,
                title: slot_title(slot),
                working: working_count,
                health: health_color(working_count, meta_count),
                mined: format_thousands(total),
            }
        })
        .collect()
}

/// One refresh cycle: three concurrent fetches, all of which must succeed
/// (HTTP and envelope) or the cycle yields an error and no grid is produced.
/// The swap is transactional — callers publish the returned grid whole, so a
/// failing cycle never leaves a partially-updated grid behind.
pub async fn refresh(client: &BackendClient) -> Result<Vec<CardState>> {
    let (meta, working, mined) = tokio::try_join!(
        client.bots_meta(),
        client.bots_funcionando(),
        client.total_minerado(),
    )?;
    debug!(
        target: "diag",
        "cards: meta={} working={} mined={}",
        meta.len(),
        working.len(),
        mined.len()
    );
    Ok(build_grid(&meta, &working, &mined))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(entries: &[(&str, u64)]) -> HashMap<String, u64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn initial_grid_covers_every_slot_zeroed() {
        let grid = initial_grid();
        assert_eq!(grid.len(), CARD_SLOTS.len());
        assert!(grid.iter().all(|c| c.working == 0 && c.health == Health::Gray));
    }

    #[test]
    fn grid_combines_counts_color_and_mined_total() {
        let meta = counts(&[("RFB", 5)]);
        let working = counts(&[("RFB", 4)]);
        let mut mined = HashMap::new();
        mined.insert("RFB".to_string(), Some(1_234_567u64));

        let grid = build_grid(&meta, &working, &mined);
        let rfb = grid.iter().find(|c| c.robot == "RFB").unwrap();
        assert_eq!(rfb.working, 4);
        assert_eq!(rfb.health, Health::Green);
        assert_eq!(rfb.mined, "1.234.567");
    }

    #[test]
    fn robots_missing_from_payloads_default_to_zero_and_gray() {
        let grid = build_grid(&HashMap::new(), &HashMap::new(), &HashMap::new());
        let card = grid.iter().find(|c| c.robot == "OAB").unwrap();
        assert_eq!(card.working, 0);
        assert_eq!(card.health, Health::Gray);
        assert_eq!(card.mined, "0");
    }

    #[test]
    fn robots_not_in_the_table_are_ignored() {
        let meta = counts(&[("NOT A ROBOT", 3)]);
        let working = counts(&[("NOT A ROBOT", 3)]);
        let grid = build_grid(&meta, &working, &HashMap::new());
        assert_eq!(grid.len(), CARD_SLOTS.len());
        assert!(grid.iter().all(|c| c.robot != "NOT A ROBOT"));
    }

    #[test]
    fn null_mined_total_renders_as_zero() {
        let mut mined = HashMap::new();
        mined.insert("SMS".to_string(), None::<u64>);
        let grid = build_grid(&HashMap::new(), &HashMap::new(), &mined);
        let sms = grid.iter().find(|c| c.robot == "SMS").unwrap();
        assert_eq!(sms.mined, "0");
    }
}
