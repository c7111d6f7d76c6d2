//! [`SqliteStore`], the SQLite implementation of [`FieldStore`].

use std::{collections::BTreeSet, path::Path};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior, params, params_from_iter};
use terroir_core::{
  activity::{Activity, ActivityPatch, ActivityStatus, GuardedWrite, NewActivity},
  assignment::{AssignmentError, AssignmentSnapshot},
  filter::{ActivityQuery, Predicate},
  id::{ActivityId, RegionId, SiteId, UserId},
  principal::Role,
  region::Region,
  site::{NewSite, Site, SitePatch},
  store::FieldStore,
  user::{NewUser, UserAccount, UserPatch},
};

use crate::{
  Error, Result,
  encode::{
    RawActivity, RawRegion, RawSite, RawUser, decode_id, decode_id_list, encode_date,
    encode_dt, encode_photos, encode_role, encode_status,
  },
  error::in_call,
  filter::{SqlFilter, activity_filter, site_filter, user_filter},
  schema::SCHEMA,
};

// ─── Row queries ─────────────────────────────────────────────────────────────
//
// Synchronous helpers run inside `Connection::call` closures. They take a
// plain `&rusqlite::Connection` so they work on a transaction as well.

fn select_users(
  conn: &rusqlite::Connection,
  filter: &SqlFilter,
) -> rusqlite::Result<Vec<RawUser>> {
  let sql = format!(
    "SELECT u.user_id, u.username, u.display_name, u.role, u.created_at,
            GROUP_CONCAT(ur.region_id)
     FROM users u
     LEFT JOIN user_regions ur ON ur.user_id = u.user_id
     WHERE {}
     GROUP BY u.user_id
     ORDER BY u.username",
    filter.clause
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(params_from_iter(filter.params.iter()), |row| {
      Ok(RawUser {
        user_id:      row.get(0)?,
        username:     row.get(1)?,
        display_name: row.get(2)?,
        role:         row.get(3)?,
        created_at:   row.get(4)?,
        region_ids:   row.get(5)?,
      })
    })?
    .collect()
}

fn select_sites(
  conn: &rusqlite::Connection,
  filter: &SqlFilter,
) -> rusqlite::Result<Vec<RawSite>> {
  let sql = format!(
    "SELECT s.site_id, s.name, s.region_id, s.locality, s.latitude, s.longitude,
            s.created_at, GROUP_CONCAT(sa.user_id)
     FROM sites s
     LEFT JOIN site_assignments sa ON sa.site_id = s.site_id
     WHERE {}
     GROUP BY s.site_id
     ORDER BY s.name",
    filter.clause
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(params_from_iter(filter.params.iter()), |row| {
      Ok(RawSite {
        site_id:      row.get(0)?,
        name:         row.get(1)?,
        region_id:    row.get(2)?,
        locality:     row.get(3)?,
        latitude:     row.get(4)?,
        longitude:    row.get(5)?,
        created_at:   row.get(6)?,
        assigned_ids: row.get(7)?,
      })
    })?
    .collect()
}

fn select_activities(
  conn: &rusqlite::Connection,
  filter: &SqlFilter,
) -> rusqlite::Result<Vec<RawActivity>> {
  let sql = format!(
    "SELECT a.activity_id, a.site_id, a.region_id, a.created_by, a.kind, a.theme,
            a.duration_minutes, a.performed_on, a.comments, a.photos, a.status,
            a.reviewed_by, a.reviewed_at, a.created_at
     FROM activities a
     WHERE {}
     ORDER BY a.performed_on DESC, a.created_at DESC",
    filter.clause
  );
  let mut stmt = conn.prepare(&sql)?;
  stmt
    .query_map(params_from_iter(filter.params.iter()), |row| {
      Ok(RawActivity {
        activity_id:      row.get(0)?,
        site_id:          row.get(1)?,
        region_id:        row.get(2)?,
        created_by:       row.get(3)?,
        kind:             row.get(4)?,
        theme:            row.get(5)?,
        duration_minutes: row.get(6)?,
        performed_on:     row.get(7)?,
        comments:         row.get(8)?,
        photos:           row.get(9)?,
        status:           row.get(10)?,
        reviewed_by:      row.get(11)?,
        reviewed_at:      row.get(12)?,
        created_at:       row.get(13)?,
      })
    })?
    .collect()
}

/// The first id in `region_ids` with no `regions` row, if any.
fn first_unknown_region(
  conn: &rusqlite::Connection,
  region_ids: &[String],
) -> rusqlite::Result<Option<String>> {
  for id in region_ids {
    let known = conn
      .query_row("SELECT 1 FROM regions WHERE region_id = ?1", params![id], |_| Ok(()))
      .optional()?
      .is_some();
    if !known {
      return Ok(Some(id.clone()));
    }
  }
  Ok(None)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A terroir field store backed by a single SQLite file.
///
/// Clones share one background connection thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a fresh in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── FieldStore impl ─────────────────────────────────────────────────────────

impl FieldStore for SqliteStore {
  type Error = Error;

  // ── Regions ───────────────────────────────────────────────────────────────

  async fn add_region(&self, name: String) -> Result<Region> {
    let region = Region { region_id: RegionId::generate(), name };
    let id_str = region.region_id.to_string();
    let name = region.name.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO regions (region_id, name) VALUES (?1, ?2)",
          params![id_str, name],
        )?;
        Ok(())
      })
      .await?;

    Ok(region)
  }

  async fn list_regions(&self) -> Result<Vec<Region>> {
    let raws: Vec<RawRegion> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT region_id, name FROM regions ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| Ok(RawRegion { region_id: row.get(0)?, name: row.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRegion::into_region).collect()
  }

  async fn list_regions_of(&self, user_id: UserId) -> Result<BTreeSet<RegionId>> {
    let id_str = user_id.to_string();

    let joined: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT GROUP_CONCAT(region_id) FROM user_regions WHERE user_id = ?1",
          params![id_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    decode_id_list(joined.as_deref())
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<UserAccount> {
    let account = UserAccount {
      user_id:      UserId::generate(),
      username:     input.username,
      display_name: input.display_name,
      role:         input.role,
      region_ids:   input.region_ids,
      created_at:   Utc::now(),
    };

    let id_str   = account.user_id.to_string();
    let username = account.username.clone();
    let display  = account.display_name.clone();
    let role_str = encode_role(account.role);
    let at_str   = encode_dt(account.created_at);
    let hash     = input.password_hash;
    let regions: Vec<String> = account.region_ids.iter().map(ToString::to_string).collect();

    // Ok(Err(..)) carries a rejected input out of the closure.
    let outcome: std::result::Result<(), Error> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let taken = tx
          .query_row("SELECT 1 FROM users WHERE username = ?1", params![username], |_| Ok(()))
          .optional()?
          .is_some();
        if taken {
          return Ok(Err(Error::UsernameTaken(username)));
        }
        if let Some(unknown) = first_unknown_region(&tx, &regions)? {
          let region = decode_id(&unknown).map_err(in_call)?;
          return Ok(Err(Error::UnknownRegion(region)));
        }

        tx.execute(
          "INSERT INTO users (user_id, username, display_name, role, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          params![id_str, username, display, role_str, hash, at_str],
        )?;
        for region in &regions {
          tx.execute(
            "INSERT INTO user_regions (user_id, region_id) VALUES (?1, ?2)",
            params![id_str, region],
          )?;
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    outcome?;
    Ok(account)
  }

  async fn get_user(&self, id: UserId) -> Result<Option<UserAccount>> {
    let filter = SqlFilter::eq("u.user_id", id.to_string());

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| Ok(select_users(conn, &filter)?.into_iter().next()))
      .await?;

    raw.map(RawUser::into_account).transpose()
  }

  async fn find_credentials(&self, username: &str) -> Result<Option<(UserAccount, String)>> {
    let username = username.to_owned();

    let found: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT user_id, password_hash FROM users WHERE username = ?1",
            params![username],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?)
      })
      .await?;

    let Some((id_str, hash)) = found else {
      return Ok(None);
    };
    let account = self.get_user(decode_id(&id_str)?).await?;
    Ok(account.map(|a| (a, hash)))
  }

  async fn update_user(&self, id: UserId, patch: UserPatch) -> Result<Option<UserAccount>> {
    let id_str = id.to_string();
    let UserPatch { display_name, role, region_ids, password_hash } = patch;
    let role_str = role.map(encode_role);
    let leaves_conseiller = role.is_some_and(|r| r != Role::Conseiller);
    let regions: Option<Vec<String>> =
      region_ids.map(|set| set.iter().map(ToString::to_string).collect());

    let outcome: std::result::Result<bool, Error> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists = tx
          .query_row("SELECT 1 FROM users WHERE user_id = ?1", params![id_str], |_| Ok(()))
          .optional()?
          .is_some();
        if !exists {
          return Ok(Ok(false));
        }

        if let Some(name) = display_name {
          tx.execute(
            "UPDATE users SET display_name = ?1 WHERE user_id = ?2",
            params![name, id_str],
          )?;
        }
        if let Some(hash) = password_hash {
          tx.execute(
            "UPDATE users SET password_hash = ?1 WHERE user_id = ?2",
            params![hash, id_str],
          )?;
        }
        if let Some(role) = role_str {
          tx.execute("UPDATE users SET role = ?1 WHERE user_id = ?2", params![role, id_str])?;
          if leaves_conseiller {
            tx.execute("DELETE FROM site_assignments WHERE user_id = ?1", params![id_str])?;
          }
        }
        if let Some(regions) = regions {
          if let Some(unknown) = first_unknown_region(&tx, &regions)? {
            let region = decode_id(&unknown).map_err(in_call)?;
            return Ok(Err(Error::UnknownRegion(region)));
          }
          tx.execute("DELETE FROM user_regions WHERE user_id = ?1", params![id_str])?;
          for region in &regions {
            tx.execute(
              "INSERT INTO user_regions (user_id, region_id) VALUES (?1, ?2)",
              params![id_str, region],
            )?;
          }
          // Keep every remaining assignment inside the new region set.
          let pruned = tx.execute(
            "DELETE FROM site_assignments
             WHERE user_id = ?1
               AND site_id IN (
                 SELECT s.site_id FROM sites s
                 WHERE s.region_id NOT IN (
                   SELECT region_id FROM user_regions WHERE user_id = ?1))",
            params![id_str],
          )?;
          if pruned > 0 {
            tracing::debug!(user = %id_str, pruned, "dropped out-of-region assignments");
          }
        }

        tx.commit()?;
        Ok(Ok(true))
      })
      .await?;

    if !outcome? {
      return Ok(None);
    }
    self.get_user(id).await
  }

  async fn delete_user(&self, id: UserId) -> Result<bool> {
    let id_str = id.to_string();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM users WHERE user_id = ?1", params![id_str])?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn list_users(&self, filter: &Predicate) -> Result<Vec<UserAccount>> {
    let filter = user_filter(filter);

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| Ok(select_users(conn, &filter)?))
      .await?;

    raws.into_iter().map(RawUser::into_account).collect()
  }

  async fn count_users(&self) -> Result<u64> {
    let n: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?))
      .await?;
    Ok(n as u64)
  }

  // ── Sites ─────────────────────────────────────────────────────────────────

  async fn add_site(&self, input: NewSite) -> Result<Site> {
    let site = Site {
      site_id:           SiteId::generate(),
      name:              input.name,
      region_id:         input.region_id,
      locality:          input.locality,
      latitude:          input.latitude,
      longitude:         input.longitude,
      assigned_user_ids: BTreeSet::new(),
      created_at:        Utc::now(),
    };

    let id_str     = site.site_id.to_string();
    let name       = site.name.clone();
    let region_str = site.region_id.to_string();
    let locality   = site.locality.clone();
    let (lat, lon) = (site.latitude, site.longitude);
    let at_str     = encode_dt(site.created_at);

    let known: bool = self
      .conn
      .call(move |conn| {
        if first_unknown_region(conn, std::slice::from_ref(&region_str))?.is_some() {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO sites (site_id, name, region_id, locality, latitude, longitude, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          params![id_str, name, region_str, locality, lat, lon, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !known {
      return Err(Error::UnknownRegion(site.region_id));
    }
    Ok(site)
  }

  async fn get_site(&self, id: SiteId) -> Result<Option<Site>> {
    let filter = SqlFilter::eq("s.site_id", id.to_string());

    let raw: Option<RawSite> = self
      .conn
      .call(move |conn| Ok(select_sites(conn, &filter)?.into_iter().next()))
      .await?;

    raw.map(RawSite::into_site).transpose()
  }

  async fn update_site(&self, id: SiteId, patch: SitePatch) -> Result<Option<Site>> {
    let id_str = id.to_string();
    let SitePatch { name, locality, latitude, longitude } = patch;

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE sites SET
             name      = COALESCE(?2, name),
             locality  = COALESCE(?3, locality),
             latitude  = COALESCE(?4, latitude),
             longitude = COALESCE(?5, longitude)
           WHERE site_id = ?1",
          params![id_str, name, locality, latitude, longitude],
        )?)
      })
      .await?;

    if updated == 0 {
      return Ok(None);
    }
    self.get_site(id).await
  }

  async fn delete_site(&self, id: SiteId) -> Result<bool> {
    let id_str = id.to_string();

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM site_assignments WHERE site_id = ?1", params![id_str])?;
        let n = tx.execute("DELETE FROM sites WHERE site_id = ?1", params![id_str])?;
        tx.commit()?;
        Ok(n)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn list_sites(&self, filter: &Predicate) -> Result<Vec<Site>> {
    let filter = site_filter(filter);

    let raws: Vec<RawSite> = self
      .conn
      .call(move |conn| Ok(select_sites(conn, &filter)?))
      .await?;

    raws.into_iter().map(RawSite::into_site).collect()
  }

  async fn count_activities_for_site(&self, id: SiteId) -> Result<u64> {
    let id_str = id.to_string();

    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM activities WHERE site_id = ?1",
          params![id_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(n as u64)
  }

  // ── Activities ────────────────────────────────────────────────────────────

  async fn add_activity(&self, input: NewActivity) -> Result<Activity> {
    let activity = Activity {
      activity_id: ActivityId::generate(),
      site_id:     input.site_id,
      region_id:   input.region_id,
      created_by:  input.created_by,
      details:     input.details,
      status:      ActivityStatus::EnAttente,
      reviewed_by: None,
      reviewed_at: None,
      created_at:  Utc::now(),
    };

    let id_str      = activity.activity_id.to_string();
    let site_str    = activity.site_id.to_string();
    let region_str  = activity.region_id.to_string();
    let author_str  = activity.created_by.to_string();
    let kind        = activity.details.kind.clone();
    let theme       = activity.details.theme.clone();
    let minutes     = activity.details.duration_minutes;
    let date_str    = encode_date(activity.details.performed_on);
    let comments    = activity.details.comments.clone();
    let photos_str  = encode_photos(&activity.details.photos)?;
    let status_str  = encode_status(activity.status);
    let at_str      = encode_dt(activity.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO activities (
             activity_id, site_id, region_id, created_by, kind, theme,
             duration_minutes, performed_on, comments, photos, status, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          params![
            id_str, site_str, region_str, author_str, kind, theme,
            minutes, date_str, comments, photos_str, status_str, at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(activity)
  }

  async fn get_activity(&self, id: ActivityId) -> Result<Option<Activity>> {
    let filter = SqlFilter::eq("a.activity_id", id.to_string());

    let raw: Option<RawActivity> = self
      .conn
      .call(move |conn| Ok(select_activities(conn, &filter)?.into_iter().next()))
      .await?;

    raw.map(RawActivity::into_activity).transpose()
  }

  async fn update_activity(
    &self,
    id: ActivityId,
    expected: ActivityStatus,
    patch: ActivityPatch,
  ) -> Result<GuardedWrite> {
    let filter = SqlFilter::eq("a.activity_id", id.to_string());

    let outcome = self
      .conn
      .call(move |conn| {
        // The status check and the write share the write lock, so a review
        // cannot land between them.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(raw) = select_activities(&tx, &filter)?.into_iter().next() else {
          return Ok(GuardedWrite::Missing);
        };
        let current = raw.into_activity().map_err(in_call)?;
        if current.status != expected {
          return Ok(GuardedWrite::Stale(current));
        }

        let details = patch.apply(current.details.clone());
        let photos_str = encode_photos(&details.photos).map_err(in_call)?;
        tx.execute(
          "UPDATE activities SET
             kind = ?2, theme = ?3, duration_minutes = ?4,
             performed_on = ?5, comments = ?6, photos = ?7
           WHERE activity_id = ?1",
          params![
            current.activity_id.to_string(),
            details.kind,
            details.theme,
            details.duration_minutes,
            encode_date(details.performed_on),
            details.comments,
            photos_str,
          ],
        )?;
        tx.commit()?;
        Ok(GuardedWrite::Written(Activity { details, ..current }))
      })
      .await?;

    Ok(outcome)
  }

  async fn set_activity_status(
    &self,
    id: ActivityId,
    status: ActivityStatus,
    reviewer: UserId,
  ) -> Result<GuardedWrite> {
    let id_str       = id.to_string();
    let status_str   = encode_status(status);
    let pending_str  = encode_status(ActivityStatus::EnAttente);
    let reviewer_str = reviewer.to_string();
    let at_str       = encode_dt(Utc::now());

    let (written, raw): (bool, Option<RawActivity>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let updated = tx.execute(
          "UPDATE activities SET status = ?2, reviewed_by = ?3, reviewed_at = ?4
           WHERE activity_id = ?1 AND status = ?5",
          params![id_str, status_str, reviewer_str, at_str, pending_str],
        )?;
        let row = select_activities(&tx, &SqlFilter::eq("a.activity_id", id_str))?
          .into_iter()
          .next();
        tx.commit()?;
        Ok((updated > 0, row))
      })
      .await?;

    Ok(match raw {
      None => GuardedWrite::Missing,
      Some(raw) if written => GuardedWrite::Written(raw.into_activity()?),
      Some(raw) => GuardedWrite::Stale(raw.into_activity()?),
    })
  }

  async fn delete_activity(&self, id: ActivityId) -> Result<bool> {
    let id_str = id.to_string();

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM activities WHERE activity_id = ?1", params![id_str])?)
      })
      .await?;

    Ok(deleted > 0)
  }

  async fn list_activities(
    &self,
    filter: &Predicate,
    query: &ActivityQuery,
  ) -> Result<Vec<Activity>> {
    let mut filter = activity_filter(filter);
    if let Some(site) = query.site_id {
      filter = filter.and(SqlFilter::eq("a.site_id", site.to_string()));
    }
    if let Some(status) = query.status {
      filter = filter.and(SqlFilter::eq("a.status", encode_status(status)));
    }

    let raws: Vec<RawActivity> = self
      .conn
      .call(move |conn| Ok(select_activities(conn, &filter)?))
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  // ── Assignments ───────────────────────────────────────────────────────────

  async fn assigned_site_ids(&self, user_id: UserId) -> Result<BTreeSet<SiteId>> {
    let id_str = user_id.to_string();

    let joined: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT GROUP_CONCAT(site_id) FROM site_assignments WHERE user_id = ?1",
          params![id_str],
          |row| row.get(0),
        )?)
      })
      .await?;

    decode_id_list(joined.as_deref())
  }

  async fn replace_assignments<V>(
    &self,
    user_id: UserId,
    site_ids: BTreeSet<SiteId>,
    validate: V,
  ) -> Result<std::result::Result<(), AssignmentError>>
  where
    V: FnOnce(&AssignmentSnapshot) -> std::result::Result<(), AssignmentError>
      + Send
      + 'static,
  {
    let user_str = user_id.to_string();
    let at_str = encode_dt(Utc::now());

    let outcome = self
      .conn
      .call(move |conn| {
        // IMMEDIATE takes the write lock up front, so the user's regions
        // cannot change between validation and commit.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let target = select_users(&tx, &SqlFilter::eq("u.user_id", user_str.clone()))?
          .into_iter()
          .next()
          .map(RawUser::into_account)
          .transpose()
          .map_err(in_call)?;

        let wanted: BTreeSet<String> = site_ids.iter().map(ToString::to_string).collect();
        let sites = select_sites(&tx, &SqlFilter::is_in("s.site_id", &wanted))?
          .into_iter()
          .map(RawSite::into_site)
          .collect::<Result<Vec<_>>>()
          .map_err(in_call)?;
        let missing_sites = site_ids
          .iter()
          .filter(|id| !sites.iter().any(|s| s.site_id == **id))
          .copied()
          .collect();

        let snapshot = AssignmentSnapshot { target, sites, missing_sites };
        if let Err(e) = validate(&snapshot) {
          // Dropping `tx` rolls back.
          return Ok(Err(e));
        }

        tx.execute("DELETE FROM site_assignments WHERE user_id = ?1", params![user_str])?;
        for site in &wanted {
          tx.execute(
            "INSERT INTO site_assignments (user_id, site_id, assigned_at) VALUES (?1, ?2, ?3)",
            params![user_str, site, at_str],
          )?;
        }
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;

    Ok(outcome)
  }

  async fn remove_assignment(&self, user_id: UserId, site_id: SiteId) -> Result<()> {
    let user_str = user_id.to_string();
    let site_str = site_id.to_string();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM site_assignments WHERE user_id = ?1 AND site_id = ?2",
          params![user_str, site_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(())
  }
}
