//! Order independence of non-fast-scrollable regions
//!
//! A region built from the same rectangles must answer every containment and
//! intersection query the same way, whatever order the rectangles were united in.

use blitz_scrolling::Region;
use blitz_traits::geometry::{LayoutPoint, LayoutRect, layout_rect};

fn random_rects(rng: &mut fastrand::Rng, count: usize) -> Vec<LayoutRect> {
    (0..count)
        .map(|_| {
            layout_rect(
                rng.u32(0..500) as f32,
                rng.u32(0..500) as f32,
                rng.u32(0..200) as f32,
                rng.u32(0..200) as f32,
            )
        })
        .collect()
}

fn random_points(rng: &mut fastrand::Rng, count: usize) -> Vec<LayoutPoint> {
    (0..count)
        .map(|_| LayoutPoint::new(rng.f32() * 750.0, rng.f32() * 750.0))
        .collect()
}

#[test]
fn test_union_order_does_not_change_containment() {
    let mut rng = fastrand::Rng::with_seed(0x5c0_11);
    for _ in 0..50 {
        let mut rects = random_rects(&mut rng, 12);
        let probes = random_points(&mut rng, 200);
        let boxes = random_rects(&mut rng, 50);

        let reference: Region = rects.iter().copied().collect();
        for _ in 0..5 {
            rng.shuffle(&mut rects);
            let shuffled: Region = rects.iter().copied().collect();

            for point in &probes {
                assert_eq!(
                    reference.contains(*point),
                    shuffled.contains(*point),
                    "containment of {point:?} depends on union order"
                );
            }
            for rect in &boxes {
                assert_eq!(
                    reference.intersects(rect),
                    shuffled.intersects(rect),
                    "intersection with {rect:?} depends on union order"
                );
            }
            assert_eq!(reference.bounds(), shuffled.bounds(), "bounds depend on union order");
        }
    }
}

#[test]
fn test_union_of_regions_is_associative() {
    let mut rng = fastrand::Rng::with_seed(42);
    let a: Region = random_rects(&mut rng, 5).into_iter().collect();
    let b: Region = random_rects(&mut rng, 5).into_iter().collect();
    let c: Region = random_rects(&mut rng, 5).into_iter().collect();

    let mut left = a.clone();
    left.unite_region(&b);
    left.unite_region(&c);

    let mut bc = b.clone();
    bc.unite_region(&c);
    let mut right = a.clone();
    right.unite_region(&bc);

    for point in random_points(&mut rng, 500) {
        assert_eq!(left.contains(point), right.contains(point), "at {point:?}");
    }
}

#[test]
fn test_shared_edges_are_counted_once() {
    // Two rects sharing the edge x = 100: the edge belongs to the right one only
    let region: Region = [
        layout_rect(0.0, 0.0, 100.0, 100.0),
        layout_rect(100.0, 0.0, 100.0, 100.0),
    ]
    .into_iter()
    .collect();
    assert!(region.contains(LayoutPoint::new(100.0, 50.0)));
    assert!(!region.contains(LayoutPoint::new(200.0, 50.0)));
    assert!(!region.contains(LayoutPoint::new(50.0, 100.0)));
}
