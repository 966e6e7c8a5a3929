//! Traits for package identity.

/// Types that carry a software identity.
pub trait PackageExt {
    /// Returns the software name as encoded by the package.
    fn name(&self) -> &str;

    /// Returns the version string as encoded by the package. May be empty.
    fn version(&self) -> &str;
}
