use std::fmt;

use serde::Serialize;

/// Identifier of a Tandem facility, the trailing segment of a `urn:adsk.dtt:<facilityId>` URN.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FacilityId(String);

impl FacilityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FacilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Extracts the facility id from a facility URN.
///
/// Returns `None` for a missing or empty URN and when nothing follows the last `:`.
pub fn parse_facility_id(urn: Option<&str>) -> Option<FacilityId> {
    let urn = urn.filter(|urn| !urn.is_empty())?;
    let id = urn.rsplit(':').next()?;

    (!id.is_empty()).then(|| FacilityId(id.to_string()))
}
