//! Dependency directives of a pod unit's `[Unit]` section.

/// Comment introducing dependencies declared by the user.
pub const USER_DEPENDENCIES_COMMENT: &str = "# User-defined dependencies";

/// Dependencies of a pod unit.
///
/// Member container units and user-declared dependencies are kept apart:
/// the former always render as `Requires=`/`Before=`, the latter only when
/// declared, in their own block. Lists keep input order and are never
/// merged or deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyBlock {
    /// Member container units, without `.service` suffix
    pub required: Vec<String>,
    /// User-declared `Wants=`
    pub wants: Vec<String>,
    /// User-declared `After=`
    pub after: Vec<String>,
    /// User-declared `Requires=`
    pub requires: Vec<String>,
}

/// Build the dependency block of a pod unit.
pub fn compose_dependencies<S: AsRef<str>>(
    required: &[S],
    wants: &[S],
    after: &[S],
    requires: &[S],
) -> DependencyBlock {
    fn owned<S: AsRef<str>>(list: &[S]) -> Vec<String> {
        list.iter().map(|s| s.as_ref().to_string()).collect()
    }

    DependencyBlock {
        required: owned(required),
        wants: owned(wants),
        after: owned(after),
        requires: owned(requires),
    }
}

impl DependencyBlock {
    /// Whether any user-declared dependency exists.
    pub fn has_user_defined(&self) -> bool {
        !(self.wants.is_empty() && self.after.is_empty() && self.requires.is_empty())
    }

    /// Member units as a space-separated `.service` list.
    pub fn required_units(&self) -> String {
        self.required
            .iter()
            .map(|name| format!("{}.service", name))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `Requires=` and `Before=` lines for the member units.
    ///
    /// Rendered even when there are no members, as bare directives.
    pub fn required_lines(&self) -> Vec<String> {
        let units = self.required_units();
        vec![format!("Requires={}", units), format!("Before={}", units)]
    }

    /// The user-defined block, starting with a blank separator line.
    ///
    /// Empty when nothing was declared.
    pub fn user_defined_lines(&self) -> Vec<String> {
        if !self.has_user_defined() {
            return Vec::new();
        }

        let mut lines = vec![String::new(), USER_DEPENDENCIES_COMMENT.to_string()];
        for (key, list) in [
            ("Wants", &self.wants),
            ("After", &self.after),
            ("Requires", &self.requires),
        ] {
            if !list.is_empty() {
                lines.push(format!("{}={}", key, list.join(" ")));
            }
        }
        lines
    }
}
