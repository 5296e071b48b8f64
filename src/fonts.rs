//! Font allow-list: decides which text items stay editable.
//!
//! Keynote reports PostScript font names (`Roboto-Bold`, `Inter-Regular`).
//! The family is the part before the first hyphen; an item is "safe" when
//! that family starts with one of the configured names.

/// Font families whose text is kept as editable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontAllowList {
    families: Vec<String>,
}

impl FontAllowList {
    /// Parses a comma-separated list such as `"Roboto, Inter"`.
    pub fn parse(spec: &str) -> Self {
        Self::from_families(spec.split(','))
    }

    /// Builds the list from individual family names.
    ///
    /// Entries are trimmed and blanks dropped: an empty prefix would match
    /// every font.
    pub fn from_families<I, S>(families: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let families = families
            .into_iter()
            .map(|f| f.as_ref().trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        FontAllowList { families }
    }

    pub fn families(&self) -> &[String] {
        &self.families
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Returns true if `font_name` belongs to an allowed family.
    pub fn is_safe(&self, font_name: &str) -> bool {
        let family = font_family(font_name);
        self.families.iter().any(|allowed| family.starts_with(allowed.as_str()))
    }

    /// Like `is_safe`, for items whose font could not be read.
    pub fn is_safe_opt(&self, font_name: Option<&str>) -> bool {
        font_name.is_some_and(|f| self.is_safe(f))
    }
}

impl Default for FontAllowList {
    fn default() -> Self {
        FontAllowList::from_families(["Roboto"])
    }
}

/// Strips the PostScript style suffix: `Roboto-BoldItalic` -> `Roboto`.
pub fn font_family(font_name: &str) -> &str {
    font_name.split('-').next().unwrap_or(font_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_strips_style_suffix() {
        assert_eq!(font_family("Roboto-Bold"), "Roboto");
        assert_eq!(font_family("Helvetica"), "Helvetica");
        assert_eq!(font_family(""), "");
    }

    #[test]
    fn parse_trims_and_drops_blanks() {
        let list = FontAllowList::parse(" Roboto , ,Inter,");
        assert_eq!(list.families(), ["Roboto", "Inter"]);
    }

    #[test]
    fn styled_names_match_their_family() {
        let list = FontAllowList::parse("Roboto");
        assert!(list.is_safe("Roboto-Regular"));
        assert!(list.is_safe("Roboto"));
        assert!(!list.is_safe("Helvetica-Bold"));
    }

    /// Prefix matching on the family lets "Roboto" cover "RobotoMono".
    #[test]
    fn family_prefix_covers_related_families() {
        let list = FontAllowList::parse("Roboto");
        assert!(list.is_safe("RobotoMono-Light"));
        assert!(!list.is_safe("NotoSans-Roboto"));
    }

    #[test]
    fn matching_is_case_sensitive() {
        let list = FontAllowList::parse("Roboto");
        assert!(!list.is_safe("roboto-Regular"));
    }

    #[test]
    fn missing_font_is_never_safe() {
        let list = FontAllowList::default();
        assert!(!list.is_safe_opt(None));
        assert!(list.is_safe_opt(Some("Roboto-Medium")));
    }

    #[test]
    fn blank_spec_yields_empty_list_matching_nothing() {
        let list = FontAllowList::parse(" , ");
        assert!(list.is_empty());
        assert!(!list.is_safe("Roboto-Regular"));
    }
}
