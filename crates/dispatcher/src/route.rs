//! Per-sink record routing
//!
//! A sink can subscribe to a slice of the record stream instead of the
//! full fan-out: shot records only, hits only, or a single target's
//! hits. Configured through the sink's `filter` / `target` params.

use std::collections::HashMap;

use contracts::CorrelatedRecord;

/// What slice of the record stream a sink receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    scope: FilterScope,
    target: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum FilterScope {
    /// Every record, control events included
    #[default]
    All,
    /// SHOT records only, paired or not
    Shots,
    /// SHOT records that claimed an impact
    Hits,
}

impl RecordFilter {
    /// Parse a filter from sink params (`filter` = all|shots|hits,
    /// `target` = a target label).
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let scope = match params.get("filter").map(String::as_str) {
            None | Some("all") => FilterScope::All,
            Some("shots") => FilterScope::Shots,
            Some("hits") => FilterScope::Hits,
            Some(other) => return Err(format!("unknown filter '{}'", other)),
        };
        Ok(Self {
            scope,
            target: params.get("target").cloned(),
        })
    }

    /// Restrict to SHOT records only.
    pub fn shots_only() -> Self {
        Self {
            scope: FilterScope::Shots,
            target: None,
        }
    }

    /// Whether this sink wants the record.
    ///
    /// A target restriction implies hits: control records and unpaired
    /// shots carry no target to match.
    pub fn accepts(&self, record: &CorrelatedRecord) -> bool {
        if let Some(want) = &self.target {
            return record.impact.as_ref().is_some_and(|i| &i.target == want);
        }
        match self.scope {
            FilterScope::All => true,
            FilterScope::Shots => record.quality.is_some(),
            FilterScope::Hits => record.impact.is_some(),
        }
    }
}
