//! Ordered list of frame locations with a clamped cursor

use crate::error::{Result, ViewerError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCatalog {
    locations: Vec<String>,
    index: usize,
}

impl FrameCatalog {
    /// Create a catalog positioned on the first frame
    pub fn new<I, S>(locations: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let locations: Vec<String> = locations.into_iter().map(Into::into).collect();
        if locations.is_empty() {
            return Err(ViewerError::EmptyCatalog);
        }
        Ok(Self {
            locations,
            index: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// The selected location
    pub fn current(&self) -> &str {
        &self.locations[self.index]
    }

    pub fn can_previous(&self) -> bool {
        self.index > 0
    }

    pub fn can_next(&self) -> bool {
        self.index + 1 < self.locations.len()
    }

    /// Step back one frame; returns whether the selection changed
    pub fn previous(&mut self) -> bool {
        self.select(self.index.saturating_sub(1))
    }

    /// Step forward one frame; returns whether the selection changed
    pub fn next(&mut self) -> bool {
        self.select(self.index + 1)
    }

    /// Jump to `index`, clamped to the last frame
    pub fn select(&mut self, index: usize) -> bool {
        let clamped = index.min(self.locations.len() - 1);
        let changed = clamped != self.index;
        self.index = clamped;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> FrameCatalog {
        FrameCatalog::new([
            "/models/frame1.pcd",
            "/models/frame2.pcd",
            "/models/frame3.pcd",
        ])
        .unwrap()
    }

    #[test]
    fn test_empty_catalog_rejected() {
        assert!(matches!(
            FrameCatalog::new(Vec::<String>::new()),
            Err(ViewerError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_starts_on_first_frame() {
        let catalog = catalog();
        assert_eq!(catalog.current(), "/models/frame1.pcd");
        assert!(!catalog.can_previous());
        assert!(catalog.can_next());
    }

    #[test]
    fn test_previous_clamps_at_start() {
        let mut catalog = catalog();
        assert!(!catalog.previous());
        assert_eq!(catalog.index(), 0);
    }

    #[test]
    fn test_next_clamps_at_end() {
        let mut catalog = catalog();
        assert!(catalog.next());
        assert!(catalog.next());
        assert_eq!(catalog.current(), "/models/frame3.pcd");
        assert!(!catalog.can_next());
        assert!(!catalog.next());
        assert_eq!(catalog.index(), 2);
        assert!(catalog.previous());
        assert_eq!(catalog.current(), "/models/frame2.pcd");
    }

    #[test]
    fn test_select_clamps() {
        let mut catalog = catalog();
        assert!(catalog.select(10));
        assert_eq!(catalog.index(), 2);
        assert!(!catalog.select(2));
    }

    #[test]
    fn test_single_frame_catalog() {
        let mut catalog = FrameCatalog::new(["only.pcd"]).unwrap();
        assert!(!catalog.can_previous());
        assert!(!catalog.can_next());
        assert!(!catalog.next());
        assert_eq!(catalog.current(), "only.pcd");
    }
}
