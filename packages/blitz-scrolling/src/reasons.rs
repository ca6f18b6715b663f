use std::fmt;

bitflags::bitflags! {
    /// Facts about the page that force the main frame to scroll on the main thread
    ///
    /// Any non-empty value applies to the entire main scrolling area, whatever the
    /// scrolling tree would have decided for individual nodes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MainThreadScrollingReasons: u32 {
        const FORCED_ON_MAIN_THREAD = 1 << 0;
        const HAS_SLOW_REPAINT_OBJECTS = 1 << 1;
        const HAS_VIEWPORT_CONSTRAINED_OBJECTS_WITHOUT_SUPPORTING_FIXED_LAYERS = 1 << 2;
        const HAS_NON_LAYER_FIXED_OBJECTS = 1 << 3;
        const IS_IMAGE_DOCUMENT = 1 << 4;
    }
}

impl fmt::Display for MainThreadScrollingReasons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}
