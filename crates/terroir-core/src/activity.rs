//! Activity — a unit of field work recorded against a site, subject to an
//! approval workflow.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{
  id::{ActivityId, RegionId, SiteId, UserId},
  site::Site,
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Approval status. `EnAttente` is the initial state; the other two are
/// terminal.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityStatus {
  #[default]
  EnAttente,
  Approuve,
  Rejete,
}

impl ActivityStatus {
  pub fn is_terminal(self) -> bool { !matches!(self, Self::EnAttente) }
}

// ─── Business fields ─────────────────────────────────────────────────────────

/// The fields a creator fills in and may later correct while the activity is
/// still pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDetails {
  /// Kind of intervention, e.g. "formation", "visite", "démonstration".
  pub kind:             String,
  pub theme:            Option<String>,
  pub duration_minutes: u32,
  pub performed_on:     NaiveDate,
  pub comments:         Option<String>,
  /// Paths of uploaded photos, relative to the upload root.
  #[serde(default)]
  pub photos:           Vec<String>,
}

/// A persisted activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
  pub activity_id: ActivityId,
  pub site_id:     SiteId,
  /// Copied from the site when the activity is created.
  pub region_id:   RegionId,
  pub created_by:  UserId,
  #[serde(flatten)]
  pub details:     ActivityDetails,
  pub status:      ActivityStatus,
  pub reviewed_by: Option<UserId>,
  pub reviewed_at: Option<DateTime<Utc>>,
  pub created_at:  DateTime<Utc>,
}

/// Input for recording a new activity.
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub site_id:    SiteId,
  pub region_id:  RegionId,
  pub created_by: UserId,
  pub details:    ActivityDetails,
}

impl NewActivity {
  /// Build an activity on `site`. The region is always taken from the site,
  /// never from the caller.
  pub fn on_site(site: &Site, created_by: UserId, details: ActivityDetails) -> Self {
    Self {
      site_id: site.site_id,
      region_id: site.region_id,
      created_by,
      details,
    }
  }
}

/// Partial update of an activity's business fields. `None` leaves the field
/// untouched; status is changed only through the workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivityPatch {
  pub kind:             Option<String>,
  pub theme:            Option<String>,
  pub duration_minutes: Option<u32>,
  pub performed_on:     Option<NaiveDate>,
  pub comments:         Option<String>,
  pub photos:           Option<Vec<String>>,
}

impl ActivityPatch {
  /// Apply the patch to `details`, returning the merged result.
  pub fn apply(self, mut details: ActivityDetails) -> ActivityDetails {
    if let Some(kind) = self.kind {
      details.kind = kind;
    }
    if let Some(theme) = self.theme {
      details.theme = Some(theme);
    }
    if let Some(minutes) = self.duration_minutes {
      details.duration_minutes = minutes;
    }
    if let Some(date) = self.performed_on {
      details.performed_on = date;
    }
    if let Some(comments) = self.comments {
      details.comments = Some(comments);
    }
    if let Some(photos) = self.photos {
      details.photos = photos;
    }
    details
  }
}

// ─── Guarded writes ──────────────────────────────────────────────────────────

/// Outcome of a write that only applies while the activity still has the
/// status the writer last saw.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardedWrite {
  Written(Activity),
  /// The status moved on first; carries the row as it now stands.
  Stale(Activity),
  Missing,
}
