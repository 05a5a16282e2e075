//! Static catalog code tables
//!
//! Location and circulation-category codes of the legacy catalog map to
//! internal resource ids. Circulation categories of holdings and item types
//! of items share one table.

use tracing::warn;

use crate::catalog::CatalogCode;
use crate::models::Link;

/// Revision of the code tables below
pub const CODE_TABLE_VERSION: &str = "2019.1";

/// Item type / circulation category code -> item type id
#[rustfmt::skip]
pub const ITEM_TYPES: &[(&str, u32)] = &[
    ("1", 1), ("2", 2), ("3", 3), ("4", 4),
    ("5", 5), ("6", 6), ("101", 7), ("102", 8),
    ("103", 9), ("104", 10), ("105", 11), ("106", 12),
    ("110", 13), ("250", 17), ("251", 18), ("252", 19),
    ("253", 20), ("254", 21), ("255", 22), ("256", 23),
    ("257", 24), ("258", 25), ("259", 26), ("260", 27),
    ("261", 28), ("262", 29), ("300", 30), ("301", 15),
    ("303", 31), ("304", 32), ("305", 33), ("306", 34),
    ("308", 35), ("309", 36), ("310", 37), ("777", 14),
    ("999", 16),
];

/// Location code -> location id
#[rustfmt::skip]
pub const LOCATIONS: &[(&str, u32)] = &[
    ("100000", 1), ("100001", 2), ("100002", 3), ("100003", 4),
    ("200000", 5), ("200002", 5), ("200003", 6), ("200004", 7),
    ("200005", 8), ("200006", 9), ("200007", 10), ("200008", 11),
    ("200009", 12), ("200010", 13), ("300000", 14), ("300001", 15),
    ("300002", 16), ("300003", 17), ("400000", 18), ("400001", 19),
    ("400002", 20), ("400003", 21), ("400004", 22), ("400005", 23),
    ("410000", 72), ("500000", 24), ("500001", 25), ("500002", 26),
    ("500003", 27), ("500004", 28), ("600000", 29), ("600009", 30),
    ("600010", 31), ("600014", 33), ("600019", 36), ("700000", 37),
    ("700009", 38), ("700010", 39), ("800000", 41), ("900000", 42),
    ("1020000", 43), ("600020", 44), ("1040000", 45), ("1050001", 46),
    ("1050002", 47), ("1050003", 48), ("1050004", 49), ("1060000", 50),
    ("1060002", 52), ("11000000", 53), ("20600000", 54), ("20700001", 55),
    ("20700002", 56), ("20700003", 57), ("20700004", 58), ("21000000", 59),
    ("21000001", 59), ("21000002", 60), ("21000003", 61), ("21000004", 62),
    ("21000006", 63), ("21000008", 64), ("21000009", 65), ("30100000", 66),
    ("30100001", 67), ("30100002", 68), ("30200000", 69), ("30300000", 70),
    ("30400000", 71), ("200011", 73),
];

fn lookup(table: &[(&str, u32)], code: &str) -> Option<u32> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, id)| *id)
}

/// Turns catalog codes into resource links.
///
/// Unmapped codes produce no link and a warning.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    app_base_url: String,
}

impl LinkResolver {
    pub fn new(app_base_url: impl Into<String>) -> Self {
        Self {
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn app_base_url(&self) -> &str {
        &self.app_base_url
    }

    pub fn location(&self, code: Option<&CatalogCode>, warnings: &mut Vec<String>) -> Option<Link> {
        self.resolve(LOCATIONS, "locations", "location", code, warnings)
    }

    pub fn item_type(&self, code: Option<&CatalogCode>, warnings: &mut Vec<String>) -> Option<Link> {
        self.resolve(ITEM_TYPES, "item_types", "item type", code, warnings)
    }

    fn resolve(
        &self,
        table: &[(&str, u32)],
        collection: &str,
        label: &str,
        code: Option<&CatalogCode>,
        warnings: &mut Vec<String>,
    ) -> Option<Link> {
        let code = code?;
        match lookup(table, code.as_str()) {
            Some(id) => Some(Link::to_resource(&self.app_base_url, collection, id)),
            None => {
                warn!(
                    code = %code,
                    kind = label,
                    version = CODE_TABLE_VERSION,
                    "Unmapped catalog code"
                );
                warnings.push(format!("unmapped {label} code {code}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tables_have_unique_codes() {
        for table in [ITEM_TYPES, LOCATIONS] {
            let codes: HashSet<&str> = table.iter().map(|(code, _)| *code).collect();
            assert_eq!(codes.len(), table.len());
        }
    }

    #[test]
    fn test_mapped_codes() {
        let links = LinkResolver::new("https://ils.example.org/");
        let mut warnings = Vec::new();

        let location = links.location(Some(&CatalogCode::new("200002")), &mut warnings);
        let item_type = links.item_type(Some(&CatalogCode::new("301")), &mut warnings);

        assert_eq!(
            location.unwrap().reference,
            "https://ils.example.org/api/locations/5"
        );
        assert_eq!(
            item_type.unwrap().reference,
            "https://ils.example.org/api/item_types/15"
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unmapped_code_warns() {
        let links = LinkResolver::new("https://ils.example.org");
        let mut warnings = Vec::new();

        assert_eq!(links.location(Some(&CatalogCode::new("424242")), &mut warnings), None);
        assert_eq!(links.location(None, &mut warnings), None);
        assert_eq!(warnings, vec!["unmapped location code 424242"]);
    }
}
