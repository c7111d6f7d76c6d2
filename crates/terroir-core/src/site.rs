//! Sites: physical agricultural locations, the unit conseillers are
//! assigned to.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{RegionId, SiteId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
  pub site_id:           SiteId,
  pub name:              String,
  /// Fixed at creation; a site never moves between regions.
  pub region_id:         RegionId,
  pub locality:          Option<String>,
  pub latitude:          Option<f64>,
  pub longitude:         Option<f64>,
  /// Conseillers currently assigned to this site.
  pub assigned_user_ids: BTreeSet<UserId>,
  pub created_at:        DateTime<Utc>,
}

/// Input for creating a site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSite {
  pub name:      String,
  pub region_id: RegionId,
  #[serde(default)]
  pub locality:  Option<String>,
  #[serde(default)]
  pub latitude:  Option<f64>,
  #[serde(default)]
  pub longitude: Option<f64>,
}

/// Partial update of a site's descriptive fields. `None` leaves the field
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SitePatch {
  pub name:      Option<String>,
  pub locality:  Option<String>,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
}
