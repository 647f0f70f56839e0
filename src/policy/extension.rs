//! Extension policy: the dangerous-extension blocklist and the per-category
//! allow-list.

use crate::core::Rejection;
use crate::policy::registry::CategoryPolicy;

use std::collections::HashSet;

/// Extensions that are never accepted, whatever the category or content.
///
/// Server-side scripts, shell scripts and platform executables, server
/// configuration files, and markup able to carry script.
pub const DANGEROUS_EXTENSIONS: &[&str] = &[
    // Server-side scripting
    "php", "php3", "php4", "php5", "php7", "php8", "phtml", "phar", "pht", "phps", "asp", "aspx",
    "ascx", "ashx", "asmx", "asa", "cshtml", "jsp", "jspx", "cfm", "cgi", "pl", "py", "rb",
    // Shell scripts and executables
    "sh", "bash", "zsh", "ksh", "csh", "ps1", "psm1", "bat", "cmd", "com", "exe", "dll", "msi",
    "scr", "pif", "vbs", "vbe", "js", "jse", "wsf", "wsh", "hta", "jar", "cpl", "reg", "lnk",
    // Server configuration
    "htaccess", "htpasswd", "ini", "config",
    // Markup that can carry active content
    "html", "htm", "xhtml", "xht", "shtml", "svg", "svgz", "xml", "xsl", "swf",
];

/// Returns the lowercased extension of a client-supplied filename.
///
/// Directory components are discarded and trailing dots or whitespace are
/// ignored, so `"../x/shell.PHP. "` yields `"php"`. A dotfile such as
/// `".htaccess"` yields `"htaccess"`. A name without a dot yields `""`.
pub fn extract_extension(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace());

    match base.rsplit_once('.') {
        Some((_, ext)) => ext.trim().to_lowercase(),
        None => String::new(),
    }
}

/// First validation stage: decides on the filename alone.
///
/// The dangerous set is checked first and unconditionally; only then is
/// the category allow-list consulted.
#[derive(Debug, Clone)]
pub struct StructuralFilter {
    dangerous: HashSet<String>,
}

impl StructuralFilter {
    /// Creates a filter with the default dangerous set.
    pub fn new() -> Self {
        Self::with_dangerous_extensions(DANGEROUS_EXTENSIONS.iter().copied())
    }

    /// Creates a filter with a custom dangerous set.
    pub fn with_dangerous_extensions<I>(extensions: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Self {
            dangerous: extensions
                .into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Returns `true` if the extension is in the dangerous set.
    pub fn is_dangerous(&self, extension: &str) -> bool {
        self.dangerous.contains(extension)
    }

    /// Checks a filename against the dangerous set and the category policy.
    ///
    /// Returns the normalized extension on success.
    pub fn check(&self, filename: &str, policy: &CategoryPolicy) -> Result<String, Rejection> {
        let extension = extract_extension(filename);

        if self.is_dangerous(&extension) {
            return Err(Rejection::extension_blocked(&extension));
        }

        if !policy.allows_extension(&extension) {
            return Err(Rejection::extension_blocked(&extension));
        }

        Ok(extension)
    }
}

impl Default for StructuralFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RejectionKind;
    use crate::policy::PolicyRegistry;

    #[test]
    fn test_extract_extension() {
        assert_eq!(extract_extension("photo.JPG"), "jpg");
        assert_eq!(extract_extension("archive.tar.gz"), "gz");
        assert_eq!(extract_extension("README"), "");
        assert_eq!(extract_extension(".htaccess"), "htaccess");
        assert_eq!(extract_extension("shell.php."), "php");
        assert_eq!(extract_extension("shell.php .. "), "php");
        assert_eq!(extract_extension("../../etc/evil.Php3"), "php3");
        assert_eq!(extract_extension("C:\\Users\\me\\cv.pdf"), "pdf");
        assert_eq!(extract_extension("dir.d/noext"), "");
    }

    #[test]
    fn test_dangerous_extension_blocked_in_every_category() {
        let registry = PolicyRegistry::builtin();
        let filter = StructuralFilter::new();

        for (_, policy) in registry.categories() {
            let err = filter.check("avatar.php3", policy).unwrap_err();
            assert_eq!(err.kind, RejectionKind::ExtensionBlocked);
        }
    }

    #[test]
    fn test_dangerous_beats_permissive_policy() {
        let open = CategoryPolicy::new("open", 10, Vec::<&str>::new(), Vec::<&str>::new()).unwrap();
        let filter = StructuralFilter::new();

        assert!(filter.check("notes.txt", &open).is_ok());
        assert!(filter.check("payload.exe", &open).is_err());
        assert!(filter.check("image.svg", &open).is_err());
        assert!(filter.check(".htaccess", &open).is_err());
    }

    #[test]
    fn test_category_allow_list() {
        let registry = PolicyRegistry::builtin();
        let filter = StructuralFilter::new();

        assert_eq!(
            filter.check("Scan.PDF", registry.lookup("document")).unwrap(),
            "pdf"
        );

        let err = filter.check("scan.pdf", registry.lookup("image")).unwrap_err();
        assert_eq!(err.kind, RejectionKind::ExtensionBlocked);

        let err = filter.check("noextension", registry.lookup("image")).unwrap_err();
        assert_eq!(err.kind, RejectionKind::ExtensionBlocked);
    }

    #[test]
    fn test_custom_dangerous_set() {
        let filter = StructuralFilter::with_dangerous_extensions([".PNG"]);
        assert!(filter.is_dangerous("png"));
        assert!(!filter.is_dangerous("php"));
    }
}
