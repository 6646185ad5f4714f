//! Free-text country name → ISO code resolution.
//!
//! The warehouse reports geo as a human-readable country name, not a code.
//! Resolution is a pure function of the input text: trim/lowercase, alias
//! lookup (colloquial and deprecated names), exact match against the
//! canonical registry, then a case-insensitive scan. Unresolvable input is a
//! structured [`GeoResolution::Unresolved`], never an error — the extractor
//! aggregates those into the sync run instead of failing.

/// Outcome of a single country-name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeoResolution {
    Resolved {
        iso2: &'static str,
        iso3: &'static str,
    },
    Unresolved {
        raw: String,
    },
}

impl GeoResolution {
    pub fn iso2(&self) -> Option<&'static str> {
        match self {
            Self::Resolved { iso2, .. } => Some(iso2),
            Self::Unresolved { .. } => None,
        }
    }

    pub fn iso3(&self) -> Option<&'static str> {
        match self {
            Self::Resolved { iso3, .. } => Some(iso3),
            Self::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

/// Canonical country registry: (canonical name, ISO 3166-1 alpha-2, alpha-3).
/// Names are the forms the upstream collector emits for the bulk of traffic.
const REGISTRY: &[(&str, &str, &str)] = &[
    ("Argentina", "AR", "ARG"),
    ("Australia", "AU", "AUS"),
    ("Austria", "AT", "AUT"),
    ("Bangladesh", "BD", "BGD"),
    ("Belarus", "BY", "BLR"),
    ("Belgium", "BE", "BEL"),
    ("Bolivia", "BO", "BOL"),
    ("Bosnia and Herzegovina", "BA", "BIH"),
    ("Brazil", "BR", "BRA"),
    ("Bulgaria", "BG", "BGR"),
    ("Canada", "CA", "CAN"),
    ("Chile", "CL", "CHL"),
    ("China", "CN", "CHN"),
    ("Colombia", "CO", "COL"),
    ("Croatia", "HR", "HRV"),
    ("Cyprus", "CY", "CYP"),
    ("Czechia", "CZ", "CZE"),
    ("Denmark", "DK", "DNK"),
    ("Ecuador", "EC", "ECU"),
    ("Egypt", "EG", "EGY"),
    ("Estonia", "EE", "EST"),
    ("Finland", "FI", "FIN"),
    ("France", "FR", "FRA"),
    ("Georgia", "GE", "GEO"),
    ("Germany", "DE", "DEU"),
    ("Greece", "GR", "GRC"),
    ("Hong Kong", "HK", "HKG"),
    ("Hungary", "HU", "HUN"),
    ("Iceland", "IS", "ISL"),
    ("India", "IN", "IND"),
    ("Indonesia", "ID", "IDN"),
    ("Ireland", "IE", "IRL"),
    ("Israel", "IL", "ISR"),
    ("Italy", "IT", "ITA"),
    ("Japan", "JP", "JPN"),
    ("Kazakhstan", "KZ", "KAZ"),
    ("Kenya", "KE", "KEN"),
    ("Latvia", "LV", "LVA"),
    ("Lithuania", "LT", "LTU"),
    ("Luxembourg", "LU", "LUX"),
    ("Malaysia", "MY", "MYS"),
    ("Malta", "MT", "MLT"),
    ("Mexico", "MX", "MEX"),
    ("Moldova", "MD", "MDA"),
    ("Morocco", "MA", "MAR"),
    ("Netherlands", "NL", "NLD"),
    ("New Zealand", "NZ", "NZL"),
    ("Nigeria", "NG", "NGA"),
    ("North Macedonia", "MK", "MKD"),
    ("Norway", "NO", "NOR"),
    ("Pakistan", "PK", "PAK"),
    ("Peru", "PE", "PER"),
    ("Philippines", "PH", "PHL"),
    ("Poland", "PL", "POL"),
    ("Portugal", "PT", "PRT"),
    ("Romania", "RO", "ROU"),
    ("Russia", "RU", "RUS"),
    ("Saudi Arabia", "SA", "SAU"),
    ("Serbia", "RS", "SRB"),
    ("Singapore", "SG", "SGP"),
    ("Slovakia", "SK", "SVK"),
    ("Slovenia", "SI", "SVN"),
    ("South Africa", "ZA", "ZAF"),
    ("South Korea", "KR", "KOR"),
    ("Spain", "ES", "ESP"),
    ("Sweden", "SE", "SWE"),
    ("Switzerland", "CH", "CHE"),
    ("Taiwan", "TW", "TWN"),
    ("Thailand", "TH", "THA"),
    ("Turkey", "TR", "TUR"),
    ("Ukraine", "UA", "UKR"),
    ("United Arab Emirates", "AE", "ARE"),
    ("United Kingdom", "GB", "GBR"),
    ("United States", "US", "USA"),
    ("Uruguay", "UY", "URY"),
    ("Uzbekistan", "UZ", "UZB"),
    ("Vietnam", "VN", "VNM"),
];

/// Colloquial, deprecated and code-like spellings mapped onto canonical
/// registry names. Keys are lowercase; lookup happens after trim/lowercase.
const ALIASES: &[(&str, &str)] = &[
    ("bolivia (plurinational state of)", "Bolivia"),
    ("bosnia", "Bosnia and Herzegovina"),
    ("czech republic", "Czechia"),
    ("deutschland", "Germany"),
    ("england", "United Kingdom"),
    ("great britain", "United Kingdom"),
    ("holland", "Netherlands"),
    ("hong kong sar", "Hong Kong"),
    ("korea", "South Korea"),
    ("korea, republic of", "South Korea"),
    ("macedonia", "North Macedonia"),
    ("republic of korea", "South Korea"),
    ("republic of moldova", "Moldova"),
    ("russian federation", "Russia"),
    ("taiwan, province of china", "Taiwan"),
    ("the netherlands", "Netherlands"),
    ("turkiye", "Turkey"),
    ("türkiye", "Turkey"),
    ("u.s.", "United States"),
    ("u.s.a.", "United States"),
    ("uae", "United Arab Emirates"),
    ("uk", "United Kingdom"),
    ("united states of america", "United States"),
    ("us", "United States"),
    ("usa", "United States"),
    ("viet nam", "Vietnam"),
];

/// Resolve a free-text country name to ISO codes.
///
/// Deterministic and network-free: identical input always yields identical
/// output, so re-running extraction never changes geo resolution results.
pub fn resolve(country_name: &str) -> GeoResolution {
    let trimmed = country_name.trim();
    if trimmed.is_empty() {
        return GeoResolution::Unresolved { raw: String::new() };
    }
    let lower = trimmed.to_lowercase();

    let target = ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(trimmed);

    // Exact match first, then a case-insensitive scan as the fallback.
    if let Some((_, iso2, iso3)) = REGISTRY.iter().find(|(name, _, _)| *name == target) {
        return GeoResolution::Resolved { iso2, iso3 };
    }
    if let Some((_, iso2, iso3)) = REGISTRY
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(target))
    {
        return GeoResolution::Resolved { iso2, iso3 };
    }

    GeoResolution::Unresolved {
        raw: trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_aliases_case_insensitively() {
        let expected = GeoResolution::Resolved {
            iso2: "US",
            iso3: "USA",
        };
        assert_eq!(resolve("USA"), expected);
        assert_eq!(resolve("usa"), expected);
        assert_eq!(resolve(" United States of America "), expected);
        assert_eq!(resolve("United States"), expected);
    }

    #[test]
    fn resolves_canonical_names_with_odd_casing() {
        assert_eq!(
            resolve("pOlAnD"),
            GeoResolution::Resolved {
                iso2: "PL",
                iso3: "POL"
            }
        );
        assert_eq!(
            resolve("czech republic"),
            GeoResolution::Resolved {
                iso2: "CZ",
                iso3: "CZE"
            }
        );
    }

    #[test]
    fn unresolvable_input_returns_unresolved_without_panic() {
        match resolve("Atlantis") {
            GeoResolution::Unresolved { raw } => assert_eq!(raw, "Atlantis"),
            other => panic!("expected unresolved, got {other:?}"),
        }
        assert!(!resolve("").is_resolved());
        assert_eq!(resolve("   ").iso2(), None);
    }

    #[test]
    fn resolution_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(resolve("Deutschland").iso3(), Some("DEU"));
            assert_eq!(resolve("no-such-place").iso3(), None);
        }
    }
}
