//! Per-race summaries derived from a validated document.

use std::time::Duration;

use serde::Serialize;

use crate::laptime::{format_lap_time, parse_lap_time};
use crate::schema::{RaceDataDocument, RaceRecord};

/// The fastest lap of a race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FastestLap {
    /// Label of the lap, as uploaded.
    pub label: String,
    /// Parsed lap time.
    #[serde(skip)]
    pub time: Duration,
    /// Normalized `MM:SS.mmm` rendering of `time`.
    pub formatted: String,
}

/// Summary of one race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaceSummary {
    /// Race identifier.
    pub race_id: String,
    /// Track name.
    pub track: String,
    /// Finishing position text.
    pub position: String,
    /// Number of recorded laps.
    pub lap_count: usize,
    /// Fastest parseable lap, if any.
    pub fastest_lap: Option<FastestLap>,
}

impl RaceSummary {
    /// Summarise a single race.
    ///
    /// Laps whose time text does not parse are counted but never chosen as
    /// the fastest lap. Ties go to the earlier lap.
    #[must_use]
    pub fn from_record(race: &RaceRecord) -> Self {
        let fastest_lap = race
            .lap_times
            .iter()
            .filter_map(|lap| parse_lap_time(lap.time()).ok().map(|time| (lap, time)))
            .fold(None, |best: Option<(_, Duration)>, (lap, time)| match best {
                Some((_, best_time)) if best_time <= time => best,
                _ => Some((lap, time)),
            })
            .map(|(lap, time)| FastestLap {
                label: lap.label().to_string(),
                time,
                formatted: format_lap_time(time),
            });

        Self {
            race_id: race.race_id.clone(),
            track: race.track.clone(),
            position: race.position.clone(),
            lap_count: race.lap_times.len(),
            fastest_lap,
        }
    }
}

/// Summary of a whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
    /// Driver display name.
    pub driver_name: String,
    /// Races in upload order.
    pub races: Vec<RaceSummary>,
}

impl DocumentSummary {
    /// Summarise every race in the document.
    #[must_use]
    pub fn from_document(document: &RaceDataDocument) -> Self {
        Self {
            driver_name: document.profile_info.driver_name.clone(),
            races: document
                .races_data
                .iter()
                .map(RaceSummary::from_record)
                .collect(),
        }
    }

    /// Total laps across all races.
    #[must_use]
    pub fn total_laps(&self) -> usize {
        self.races.iter().map(|race| race.lap_count).sum()
    }
}
