//! Regions: reference data partitioning visibility for every role below
//! superadmin. The policy engine only ever reads regions.

use serde::{Deserialize, Serialize};

use crate::id::RegionId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
  pub region_id: RegionId,
  pub name:      String,
}
