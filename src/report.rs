//! # Report text
//!
//! The plain-text summary handed to whatever renders or delivers it.
//!
//! ```text
//!     [Hubei] epidemic statistics
//!     New confirmed: 2
//!     New deaths: 0
//!     Currently confirmed: 7
//!     Total confirmed: 68135
//!     Total healed: 63616
//!     Total deaths: 4512
//!     New asymptomatic: 0
//!     Asymptomatic: 3
//!     Updated:
//!     『2022-03-01 09:00:00』
//! ```

use crate::area::AreaRecord;
use serde::Serialize;
use std::fmt;

/// Figures for one area, ready to print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Area name.
    pub name: String,
    /// New confirmed cases today.
    pub new_confirmed: i64,
    /// New deaths today.
    pub new_dead: i64,
    /// Active cases.
    pub currently_confirmed: i64,
    /// Cumulative confirmed cases.
    pub total_confirmed: i64,
    /// Cumulative recoveries.
    pub total_healed: i64,
    /// Cumulative deaths.
    pub total_dead: i64,
    /// New asymptomatic carriers today.
    pub new_asymptomatic: i64,
    /// Current asymptomatic carriers.
    pub asymptomatic: i64,
    /// Update time shown at the bottom.
    pub last_update_time: String,
}

impl Report {
    /// Builds a report for `area`.
    ///
    /// `last_update_time` is the payload-level update time; when it is empty
    /// the area's own timestamp is shown instead.
    pub fn new(area: &AreaRecord, last_update_time: &str) -> Self {
        let last_update_time = if last_update_time.is_empty() {
            area.last_update_time.clone()
        } else {
            last_update_time.to_string()
        };

        Self {
            name: area.name.clone(),
            new_confirmed: area.today.confirmed,
            new_dead: area.today.dead,
            currently_confirmed: area.currently_confirmed(),
            total_confirmed: area.total.confirmed,
            total_healed: area.total.healed,
            total_dead: area.total.dead,
            new_asymptomatic: area.extended.new_asymptomatic,
            asymptomatic: area.extended.asymptomatic,
            last_update_time,
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] epidemic statistics", self.name)?;
        writeln!(f, "New confirmed: {}", self.new_confirmed)?;
        writeln!(f, "New deaths: {}", self.new_dead)?;
        writeln!(f, "Currently confirmed: {}", self.currently_confirmed)?;
        writeln!(f, "Total confirmed: {}", self.total_confirmed)?;
        writeln!(f, "Total healed: {}", self.total_healed)?;
        writeln!(f, "Total deaths: {}", self.total_dead)?;
        writeln!(f, "New asymptomatic: {}", self.new_asymptomatic)?;
        writeln!(f, "Asymptomatic: {}", self.asymptomatic)?;
        writeln!(f, "Updated:")?;
        write!(f, "『{}』", self.last_update_time)
    }
}
