//! Translation of [`Predicate`] into SQL `WHERE` fragments.
//!
//! Each entity has a fixed table alias (`s` sites, `a` activities, `u`
//! users). Variants that do not apply to an entity translate to `0`, so a
//! mismatched predicate selects nothing.

use std::collections::BTreeSet;

use terroir_core::filter::Predicate;

/// A `WHERE` fragment with its positional (`?`) parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlFilter {
  pub clause: String,
  pub params: Vec<String>,
}

impl SqlFilter {
  fn constant(value: bool) -> Self {
    Self { clause: if value { "1" } else { "0" }.to_owned(), params: vec![] }
  }

  pub fn eq(column: &str, value: String) -> Self {
    Self { clause: format!("{column} = ?"), params: vec![value] }
  }

  /// Both fragments; parameters keep their order.
  pub fn and(mut self, other: SqlFilter) -> Self {
    self.clause = format!("({}) AND ({})", self.clause, other.clause);
    self.params.extend(other.params);
    self
  }

  pub fn is_in<T: ToString>(column: &str, values: &BTreeSet<T>) -> Self {
    if values.is_empty() {
      return Self::constant(false);
    }
    Self {
      clause: format!("{column} IN ({})", placeholders(values.len())),
      params: values.iter().map(ToString::to_string).collect(),
    }
  }
}

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

pub fn site_filter(predicate: &Predicate) -> SqlFilter {
  match predicate {
    Predicate::All => SqlFilter::constant(true),
    Predicate::RegionIn { regions } => SqlFilter::is_in("s.region_id", regions),
    Predicate::SiteIdIn { sites } => SqlFilter::is_in("s.site_id", sites),
    Predicate::Nothing
    | Predicate::CreatedBy { .. }
    | Predicate::UserRegionOverlap { .. }
    | Predicate::SelfOnly { .. } => SqlFilter::constant(false),
  }
}

pub fn activity_filter(predicate: &Predicate) -> SqlFilter {
  match predicate {
    Predicate::All => SqlFilter::constant(true),
    Predicate::RegionIn { regions } => SqlFilter::is_in("a.region_id", regions),
    Predicate::CreatedBy { user } => SqlFilter::eq("a.created_by", user.to_string()),
    Predicate::Nothing
    | Predicate::SiteIdIn { .. }
    | Predicate::UserRegionOverlap { .. }
    | Predicate::SelfOnly { .. } => SqlFilter::constant(false),
  }
}

pub fn user_filter(predicate: &Predicate) -> SqlFilter {
  match predicate {
    Predicate::All => SqlFilter::constant(true),
    Predicate::SelfOnly { user } => SqlFilter::eq("u.user_id", user.to_string()),
    Predicate::UserRegionOverlap { regions, or_self } => {
      if regions.is_empty() {
        return SqlFilter::eq("u.user_id", or_self.to_string());
      }
      let mut params = vec![or_self.to_string()];
      params.extend(regions.iter().map(ToString::to_string));
      SqlFilter {
        clause: format!(
          "(u.user_id = ? OR EXISTS (
             SELECT 1 FROM user_regions ov
             WHERE ov.user_id = u.user_id AND ov.region_id IN ({})))",
          placeholders(regions.len())
        ),
        params,
      }
    }
    Predicate::Nothing
    | Predicate::RegionIn { .. }
    | Predicate::SiteIdIn { .. }
    | Predicate::CreatedBy { .. } => SqlFilter::constant(false),
  }
}
