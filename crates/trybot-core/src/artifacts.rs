/// Object-name substrings that make up a complete artifact download.
pub const AUTOTEST_ARCHIVE: &str = "autotest.tar";
pub const CHROME_PACKAGE: &str = "chromeos-chrome";
pub const TEST_IMAGE: &str = "chromiumos_test_image";
pub const DEBUG_SYMBOLS: &str = "debug.tgz";
pub const SYSROOT_ARCHIVE: &str = "sysroot_chromeos-base_chromeos-chrome.tar.xz";

pub const TEST_IMAGE_ARCHIVE: &str = "chromiumos_test_image.tar.xz";
pub const TEST_IMAGE_BIN: &str = "chromiumos_test_image.bin";
pub const PACKAGE_EXTENSION: &str = "tbz2";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactSet {
    names: Vec<String>,
}

impl Default for ArtifactSet {
    fn default() -> Self {
        Self::new([AUTOTEST_ARCHIVE, CHROME_PACKAGE, TEST_IMAGE, DEBUG_SYMBOLS, SYSROOT_ARCHIVE])
    }
}

impl ArtifactSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { names: names.into_iter().map(Into::into).collect() }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn wants(&self, object: &str) -> bool {
        self.names.iter().any(|n| object.contains(n.as_str()))
    }

    /// The name an object counts towards: the longest one it contains.
    /// `sysroot_chromeos-base_chromeos-chrome.tar.xz` contains
    /// `chromeos-chrome` too, but only stands in for the sysroot archive.
    pub fn claim<'a>(&'a self, object: &str) -> Option<&'a str> {
        self.names
            .iter()
            .filter(|n| object.contains(n.as_str()))
            .max_by_key(|n| n.len())
            .map(String::as_str)
    }

    /// Names that claim none of `objects`.
    pub fn missing<'a>(&'a self, objects: &[&str]) -> Vec<&'a str> {
        let claimed: Vec<&str> = objects.iter().filter_map(|o| self.claim(o)).collect();
        self.names
            .iter()
            .map(String::as_str)
            .filter(|n| !claimed.contains(n))
            .collect()
    }
}
