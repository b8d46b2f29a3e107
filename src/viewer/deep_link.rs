use tracing::debug;

use super::facility::FacilityId;

/// Deep-link parameters read from the host page query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepLink {
    /// Element to select once the facility is open. Read but not applied yet.
    pub asset: Option<String>,
    /// Full viewer URL overriding the one derived from the facility id.
    pub tandem: Option<String>,
}

impl DeepLink {
    /// Parses `asset` and `tandem` out of a query string. The first occurrence of a repeated
    /// parameter wins and a malformed query yields no deep-link.
    pub fn from_query(query: &str) -> Self {
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(query.trim_start_matches('?')).unwrap_or_default();

        let first = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.to_owned())
                .filter(|value| !value.is_empty())
        };

        Self {
            asset: first("asset"),
            tandem: first("tandem"),
        }
    }

    /// The `tandem` override when it is an absolute http(s) URL.
    pub fn tandem_url(&self) -> Option<&str> {
        self.tandem
            .as_deref()
            .filter(|url| url.starts_with("https://") || url.starts_with("http://"))
    }
}

/// Returns the deep-linked viewer URL verbatim when present, `<base>/<facility_id>` otherwise.
pub fn build_tandem_url(deep_link: &DeepLink, base: &str, facility_id: &FacilityId) -> String {
    if let Some(asset) = &deep_link.asset {
        debug!(asset = %asset, "asset deep-link parameter is not applied");
    }

    match deep_link.tandem_url() {
        Some(url) => url.to_string(),
        None => facility_url(base, facility_id),
    }
}

pub(super) fn facility_url(base: &str, facility_id: &FacilityId) -> String {
    format!("{}/{}", base.trim_end_matches('/'), facility_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::{DEFAULT_FACILITIES_BASE_URL, parse_facility_id};

    fn facility(id: &str) -> FacilityId {
        parse_facility_id(Some(id)).unwrap()
    }

    #[test]
    fn query_parameters_are_read() {
        let deep_link = DeepLink::from_query("?asset=pump-7&tandem=https%3A%2F%2Fx&other=1");

        assert_eq!(deep_link.asset.as_deref(), Some("pump-7"));
        assert_eq!(deep_link.tandem.as_deref(), Some("https://x"));
    }

    #[test]
    fn first_repeated_parameter_wins() {
        let deep_link = DeepLink::from_query("tandem=https://first&tandem=https://second");
        assert_eq!(deep_link.tandem.as_deref(), Some("https://first"));
    }

    #[test]
    fn empty_query_has_no_deep_link() {
        assert_eq!(DeepLink::from_query(""), DeepLink::default());
        assert_eq!(DeepLink::from_query("?tandem="), DeepLink::default());
    }

    #[test]
    fn tandem_parameter_is_used_verbatim() {
        let deep_link = DeepLink::from_query("?tandem=https://x");

        assert_eq!(
            build_tandem_url(&deep_link, DEFAULT_FACILITIES_BASE_URL, &facility("abc123")),
            "https://x"
        );
        assert_eq!(
            build_tandem_url(&deep_link, DEFAULT_FACILITIES_BASE_URL, &facility("other")),
            "https://x"
        );
    }

    #[test]
    fn url_derived_from_facility_without_deep_link() {
        assert_eq!(
            build_tandem_url(
                &DeepLink::default(),
                DEFAULT_FACILITIES_BASE_URL,
                &facility("abc123")
            ),
            "https://tandem.autodesk.com/pages/facilities/abc123"
        );
    }

    #[test]
    fn asset_does_not_change_url() {
        let deep_link = DeepLink::from_query("?asset=pump-7");

        assert_eq!(
            build_tandem_url(&deep_link, "https://tandem.example/facilities/", &facility("abc")),
            "https://tandem.example/facilities/abc"
        );
    }

    #[test]
    fn non_http_tandem_parameter_is_ignored() {
        let deep_link = DeepLink::from_query("?tandem=javascript:alert(1)");

        assert_eq!(deep_link.tandem_url(), None);
        assert_eq!(
            build_tandem_url(&deep_link, DEFAULT_FACILITIES_BASE_URL, &facility("abc123")),
            "https://tandem.autodesk.com/pages/facilities/abc123"
        );
    }
}
