use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub team_name: String,
    pub date: String,
    pub time_played: f64,
    pub level: i64,
    pub currency: i64,
    pub lives: i64,
    pub charging_station_charge: i64,
    pub total_haul: i64,
    pub player_count: usize,
    pub item_count: usize,
    pub instance_count: usize,
}

impl Snapshot {
    /// Whole hours and minutes of `time_played` (seconds).
    pub fn time_played_hm(&self) -> (u64, u64) {
        let total_minutes = (self.time_played.max(0.0) / 60.0) as u64;
        (total_minutes / 60, total_minutes % 60)
    }
}
