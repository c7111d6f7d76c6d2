//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, ids are
//! hyphenated lowercase UUIDs, and photo lists are compact JSON arrays.
//! Multi-valued joins (a site's assignees, a user's regions) arrive as a
//! single `GROUP_CONCAT` column.

use std::{collections::BTreeSet, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use terroir_core::{
  activity::{Activity, ActivityDetails, ActivityStatus},
  principal::Role,
  region::Region,
  site::Site,
  user::UserAccount,
};

use crate::{Error, Result};

// ─── Ids ─────────────────────────────────────────────────────────────────────

pub fn decode_id<T>(s: &str) -> Result<T>
where
  T: FromStr<Err = terroir_core::Error>,
{
  Ok(s.parse()?)
}

/// Decode a comma-separated `GROUP_CONCAT` column. `NULL` means no rows.
pub fn decode_id_list<T>(s: Option<&str>) -> Result<BTreeSet<T>>
where
  T: FromStr<Err = terroir_core::Error> + Ord,
{
  match s {
    None | Some("") => Ok(BTreeSet::new()),
    Some(list) => list.split(',').map(decode_id::<T>).collect(),
  }
}

// ─── DateTime<Utc> / NaiveDate ───────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn encode_role(role: Role) -> String { role.as_ref().to_owned() }

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse()
    .map_err(|_| terroir_core::Error::UnknownRole(s.to_owned()).into())
}

pub fn encode_status(status: ActivityStatus) -> String { status.as_ref().to_owned() }

pub fn decode_status(s: &str) -> Result<ActivityStatus> {
  s.parse()
    .map_err(|_| terroir_core::Error::UnknownStatus(s.to_owned()).into())
}

// ─── Photos ──────────────────────────────────────────────────────────────────

pub fn encode_photos(photos: &[String]) -> Result<String> {
  Ok(serde_json::to_string(photos)?)
}

pub fn decode_photos(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from a `regions` row.
pub struct RawRegion {
  pub region_id: String,
  pub name:      String,
}

impl RawRegion {
  pub fn into_region(self) -> Result<Region> {
    Ok(Region { region_id: decode_id(&self.region_id)?, name: self.name })
  }
}

/// Raw strings read from a `users` row joined with its regions.
pub struct RawUser {
  pub user_id:      String,
  pub username:     String,
  pub display_name: String,
  pub role:         String,
  pub created_at:   String,
  pub region_ids:   Option<String>,
}

impl RawUser {
  pub fn into_account(self) -> Result<UserAccount> {
    Ok(UserAccount {
      user_id:      decode_id(&self.user_id)?,
      username:     self.username,
      display_name: self.display_name,
      role:         decode_role(&self.role)?,
      region_ids:   decode_id_list(self.region_ids.as_deref())?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from a `sites` row joined with its assignees.
pub struct RawSite {
  pub site_id:      String,
  pub name:         String,
  pub region_id:    String,
  pub locality:     Option<String>,
  pub latitude:     Option<f64>,
  pub longitude:    Option<f64>,
  pub created_at:   String,
  pub assigned_ids: Option<String>,
}

impl RawSite {
  pub fn into_site(self) -> Result<Site> {
    Ok(Site {
      site_id:           decode_id(&self.site_id)?,
      name:              self.name,
      region_id:         decode_id(&self.region_id)?,
      locality:          self.locality,
      latitude:          self.latitude,
      longitude:         self.longitude,
      assigned_user_ids: decode_id_list(self.assigned_ids.as_deref())?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from an `activities` row.
pub struct RawActivity {
  pub activity_id:      String,
  pub site_id:          String,
  pub region_id:        String,
  pub created_by:       String,
  pub kind:             String,
  pub theme:            Option<String>,
  pub duration_minutes: u32,
  pub performed_on:     String,
  pub comments:         Option<String>,
  pub photos:           String,
  pub status:           String,
  pub reviewed_by:      Option<String>,
  pub reviewed_at:      Option<String>,
  pub created_at:       String,
}

impl RawActivity {
  pub fn into_activity(self) -> Result<Activity> {
    Ok(Activity {
      activity_id: decode_id(&self.activity_id)?,
      site_id:     decode_id(&self.site_id)?,
      region_id:   decode_id(&self.region_id)?,
      created_by:  decode_id(&self.created_by)?,
      details:     ActivityDetails {
        kind:             self.kind,
        theme:            self.theme,
        duration_minutes: self.duration_minutes,
        performed_on:     decode_date(&self.performed_on)?,
        comments:         self.comments,
        photos:           decode_photos(&self.photos)?,
      },
      status:      decode_status(&self.status)?,
      reviewed_by: self.reviewed_by.as_deref().map(decode_id).transpose()?,
      reviewed_at: self.reviewed_at.as_deref().map(decode_dt).transpose()?,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
