use image::imageops::replace;
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;
use imageproc::rect::Rect;

/// Boundaries of the changed regions of one binarized difference image.
///
/// Built fresh for every frame and dropped once drawn; nothing here survives
/// into the next frame.
#[derive(Debug, Default)]
pub struct ContourSet {
    contours: Vec<Contour<i32>>,
}

impl ContourSet {
    /// Trace every border of the non-zero regions in `mask`.
    ///
    /// Pixels outside the frame count as background, so regions touching the
    /// edge get an outer border along it. The full nesting tree is kept
    /// (`Contour::parent` indexes into this set), and each border is reduced
    /// to the vertices where its direction changes.
    pub fn extract(mask: &GrayImage) -> Self {
        // the tracer only opens an outer border next to an in-bounds zero
        let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
        replace(&mut padded, mask, 1, 1);

        let contours = find_contours::<i32>(&padded)
            .into_iter()
            .map(|mut c| {
                let shifted = c.points.iter().map(|p| Point::new(p.x - 1, p.y - 1)).collect();
                c.points = compress_chain(shifted);
                c
            })
            .collect();
        Self { contours }
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Contour<i32>> {
        self.contours.iter()
    }

    /// Number of outer borders, i.e. distinct changed regions.
    pub fn outer_count(&self) -> usize {
        self.contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer)
            .count()
    }

    /// Bounding rectangle of every contour, in contour order.
    pub fn bounding_rects(&self) -> impl Iterator<Item = Rect> + '_ {
        self.contours.iter().filter_map(|c| bounding_rect(&c.points))
    }
}

/// Smallest axis-aligned rectangle containing all `points`, edges inclusive.
pub fn bounding_rect(points: &[Point<i32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y) = (first.x, first.y);
    let (mut max_x, mut max_y) = (first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let width = (max_x - min_x + 1) as u32;
    let height = (max_y - min_y + 1) as u32;
    Some(Rect::at(min_x, min_y).of_size(width, height))
}

/// Drop every point that lies on a straight run between its neighbours.
///
/// The traced border is a closed 8-connected chain, so a point is kept only
/// when the step into it differs from the step out of it.
fn compress_chain(mut chain: Vec<Point<i32>>) -> Vec<Point<i32>> {
    chain.dedup();
    while chain.len() > 1 && chain.first() == chain.last() {
        chain.pop();
    }
    let n = chain.len();
    if n < 3 {
        return chain;
    }

    let step = |from: Point<i32>, to: Point<i32>| {
        ((to.x - from.x).signum(), (to.y - from.y).signum())
    };

    let kept: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = chain[(i + n - 1) % n];
            let next = chain[(i + 1) % n];
            step(prev, chain[i]) != step(chain[i], next)
        })
        .map(|i| chain[i])
        .collect();

    if kept.is_empty() {
        vec![chain[0]]
    } else {
        kept
    }
}
