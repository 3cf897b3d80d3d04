//! Static ISO3 -> M49 area-code table.
//!
//! FAOSTAT keys areas by UN M49 numeric codes; the bulk CSVs carry the same
//! codes. The table covers the CARICOM membership plus the wider Caribbean
//! basin, which is the universe this catalog configures.

/// (ISO3, M49 numeric code, FAOSTAT area name).
pub const M49_BY_ISO3: &[(&str, u32, &str)] = &[
    ("ATG", 28, "Antigua and Barbuda"),
    ("BHS", 44, "Bahamas"),
    ("BRB", 52, "Barbados"),
    ("BLZ", 84, "Belize"),
    ("CUB", 192, "Cuba"),
    ("DMA", 212, "Dominica"),
    ("DOM", 214, "Dominican Republic"),
    ("GRD", 308, "Grenada"),
    ("GUY", 328, "Guyana"),
    ("HTI", 332, "Haiti"),
    ("JAM", 388, "Jamaica"),
    ("KNA", 659, "Saint Kitts and Nevis"),
    ("LCA", 662, "Saint Lucia"),
    ("VCT", 670, "Saint Vincent and the Grenadines"),
    ("SUR", 740, "Suriname"),
    ("TTO", 780, "Trinidad and Tobago"),
];

pub fn m49_for_iso3(iso3: &str) -> Option<u32> {
    M49_BY_ISO3
        .iter()
        .find(|(code, _, _)| code.eq_ignore_ascii_case(iso3))
        .map(|(_, m49, _)| *m49)
}

pub fn area_name_for_iso3(iso3: &str) -> Option<&'static str> {
    M49_BY_ISO3
        .iter()
        .find(|(code, _, _)| code.eq_ignore_ascii_case(iso3))
        .map(|(_, _, name)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(m49_for_iso3("JAM"), Some(388));
        assert_eq!(m49_for_iso3("jam"), Some(388));
        assert_eq!(m49_for_iso3("BLZ"), Some(84));
        assert_eq!(m49_for_iso3("XYZ"), None);
    }

    #[test]
    fn area_names_match_codes() {
        assert_eq!(area_name_for_iso3("TTO"), Some("Trinidad and Tobago"));
        assert_eq!(area_name_for_iso3("VCT"), Some("Saint Vincent and the Grenadines"));
    }
}
