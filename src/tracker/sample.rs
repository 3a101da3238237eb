/// One viewport reading: how far down the chapter the viewer is and which
/// page is the last one at least partly on screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSample {
    pub scroll_fraction: f64,
    pub last_visible_index: u32,
}

impl ScrollSample {
    /// `page_heights` are the rendered heights of the chapter's pages, top to
    /// bottom, stacked with no gaps.
    pub fn from_viewport(scroll_top: f64, viewport_height: f64, page_heights: &[f64]) -> Self {
        if page_heights.is_empty() {
            return Self {
                scroll_fraction: 0.0,
                last_visible_index: 0,
            };
        }

        let scroll_top = if scroll_top.is_finite() { scroll_top.max(0.0) } else { 0.0 };
        let viewport_height = if viewport_height.is_finite() {
            viewport_height.max(0.0)
        } else {
            0.0
        };
        let document_height: f64 = page_heights.iter().map(|h| h.max(0.0)).sum();
        let scrollable = document_height - viewport_height;

        // A chapter shorter than the window is read in full as soon as it shows.
        let scroll_fraction = if scrollable <= 0.0 {
            100.0
        } else {
            (scroll_top / scrollable * 100.0).clamp(0.0, 100.0)
        };

        let viewport_bottom = scroll_top + viewport_height;
        let mut page_top = 0.0;
        let mut last_visible_index = 0;
        for (index, height) in page_heights.iter().enumerate() {
            if page_top >= viewport_bottom {
                break;
            }
            last_visible_index = index;
            page_top += height.max(0.0);
        }

        Self {
            scroll_fraction,
            last_visible_index: u32::try_from(last_visible_index).unwrap_or(u32::MAX),
        }
    }
}
