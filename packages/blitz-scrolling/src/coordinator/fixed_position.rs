use blitz_traits::geometry::{LayoutPoint, LayoutRect, LayoutSize, LayoutVector};
use blitz_traits::page::FrameViewFacts;

fn fixed_offset_for_axis(
    position: f32,
    visible: f32,
    contents: f32,
    origin: f32,
    frame_scale_factor: f32,
    relative_to_frame: bool,
) -> f32 {
    let max = contents - visible;
    if max <= 0.0 {
        return 0.0;
    }

    // Right-to-left and bottom-to-top documents scroll through negative positions
    let clamped = if origin == 0.0 {
        position.clamp(0.0, max)
    } else {
        position.clamp(-max, 0.0)
    };

    let drag_factor = if relative_to_frame {
        1.0
    } else {
        (contents - visible * frame_scale_factor) / max
    };
    clamped * drag_factor
}

/// Offset to move fixed-position layers by for a main frame scrolled to `scroll_position`
///
/// Rubber-banded positions are clamped first, so fixed content never drifts while
/// the page overscrolls. An axis that cannot scroll yields `0`.
pub fn scroll_offset_for_fixed_position(
    visible_content_rect: LayoutRect,
    contents_size: LayoutSize,
    scroll_position: LayoutPoint,
    scroll_origin: LayoutPoint,
    frame_scale_factor: f32,
    fixed_elements_layout_relative_to_frame: bool,
) -> LayoutVector {
    LayoutVector::new(
        fixed_offset_for_axis(
            scroll_position.x,
            visible_content_rect.width(),
            contents_size.width,
            scroll_origin.x,
            frame_scale_factor,
            fixed_elements_layout_relative_to_frame,
        ),
        fixed_offset_for_axis(
            scroll_position.y,
            visible_content_rect.height(),
            contents_size.height,
            scroll_origin.y,
            frame_scale_factor,
            fixed_elements_layout_relative_to_frame,
        ),
    )
}

pub(crate) fn fixed_offset_for_frame_view(facts: &FrameViewFacts, position: LayoutPoint) -> LayoutVector {
    scroll_offset_for_fixed_position(
        facts.visible_content_rect,
        facts.contents_size,
        position,
        facts.scroll_origin,
        facts.frame_scale_factor,
        facts.fixed_elements_layout_relative_to_frame,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use blitz_traits::geometry::layout_rect;

    #[test]
    fn test_position_within_range_is_kept() {
        let offset = scroll_offset_for_fixed_position(
            layout_rect(0.0, 0.0, 800.0, 600.0),
            LayoutSize::new(800.0, 1200.0),
            LayoutPoint::new(0.0, 250.0),
            LayoutPoint::zero(),
            1.0,
            false,
        );
        assert_eq!(offset, LayoutVector::new(0.0, 250.0));
    }

    #[test]
    fn test_drag_factor_with_zoom() {
        // max = 600, drag = (1200 - 600 * 1.5) / 600 = 0.5
        let offset = scroll_offset_for_fixed_position(
            layout_rect(0.0, 0.0, 800.0, 600.0),
            LayoutSize::new(800.0, 1200.0),
            LayoutPoint::new(0.0, 200.0),
            LayoutPoint::zero(),
            1.5,
            false,
        );
        assert_eq!(offset, LayoutVector::new(0.0, 100.0));

        let relative = scroll_offset_for_fixed_position(
            layout_rect(0.0, 0.0, 800.0, 600.0),
            LayoutSize::new(800.0, 1200.0),
            LayoutPoint::new(0.0, 200.0),
            LayoutPoint::zero(),
            1.5,
            true,
        );
        assert_eq!(relative, LayoutVector::new(0.0, 200.0));
    }

    #[test]
    fn test_non_zero_origin_clamps_to_negative_range() {
        let offset = scroll_offset_for_fixed_position(
            layout_rect(0.0, 0.0, 800.0, 600.0),
            LayoutSize::new(1000.0, 600.0),
            LayoutPoint::new(40.0, 0.0),
            LayoutPoint::new(200.0, 0.0),
            1.0,
            false,
        );
        assert_eq!(offset, LayoutVector::new(0.0, 0.0));

        let offset = scroll_offset_for_fixed_position(
            layout_rect(0.0, 0.0, 800.0, 600.0),
            LayoutSize::new(1000.0, 600.0),
            LayoutPoint::new(-500.0, 0.0),
            LayoutPoint::new(200.0, 0.0),
            1.0,
            false,
        );
        assert_eq!(offset, LayoutVector::new(-200.0, 0.0));
    }
}
